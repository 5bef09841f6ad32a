// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! HTTP/WebSocket wiring for the control plane: model management, the
//! download pipeline's REST+SSE surface, and the chat WebSocket endpoint.
//! The router is the one place these three subsystems meet the outside
//! world; none of them know about axum directly.

mod download_routes;
pub mod error;
mod model_mgmt;
mod ws;

use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use llmhost_chat::InferenceEngine;
use llmhost_download::Pipeline;
use llmhost_registry::Registry;

#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
    pub pipeline: Pipeline,
    pub inference_engine: Arc<dyn InferenceEngine>,
    pub models_dir: PathBuf,
    pub config_file: PathBuf,
    pub max_active_prompts: usize,
    pub chat_preamble: String,
}

/// Builds the full application router. Callers own binding and serving —
/// this crate only describes routes and state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/switch-model", post(model_mgmt::switch_model))
        .route("/models/available", get(model_mgmt::available_models))
        .route("/health", get(model_mgmt::model_health))
        .route("/api/models", get(download_routes::list_models))
        .route("/api/models/:id/status", get(download_routes::model_status))
        .route("/api/models/:id/download", get(download_routes::download_model))
        .route("/api/models/:id/download", delete(download_routes::cancel_download))
        .route("/api/health", get(download_routes::download_health))
        .route("/ws/chat", get(ws::chat_ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
