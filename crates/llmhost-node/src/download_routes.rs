// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! HTTP surface over the download pipeline: model listing/status, the SSE
//! progress stream, and cancellation.

use axum::extract::{Path as AxumPath, State};
use axum::http::header;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::stream::StreamExt;
use serde_json::json;

use llmhost_download::CancelOutcome;

use crate::AppState;

pub async fn list_models(State(state): State<AppState>) -> Json<serde_json::Value> {
    let models = state.pipeline.list().await;
    Json(json!({ "success": true, "models": models }))
}

pub async fn model_status(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> impl IntoResponse {
    match state.pipeline.status(&id).await {
        Some(detail) => {
            let mut body = serde_json::to_value(detail).expect("ModelStatusDetail is serializable");
            body["success"] = json!(true);
            Json(body).into_response()
        }
        None => (
            axum::http::StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "model not found" })),
        )
            .into_response(),
    }
}

pub async fn download_model(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> impl IntoResponse {
    let stream = state.pipeline.download(&id).map(|event| {
        let payload = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok::<_, std::convert::Infallible>(Event::default().data(payload))
    });

    let mut response = Sse::new(stream).keep_alive(KeepAlive::new()).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, "no-cache".parse().unwrap());
    response
        .headers_mut()
        .insert(header::CONNECTION, "keep-alive".parse().unwrap());
    response
        .headers_mut()
        .insert("X-Accel-Buffering", "no".parse().unwrap());
    response
}

pub async fn cancel_download(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Json<serde_json::Value> {
    let outcome = state.pipeline.cancel(&id).await;
    let message = match outcome {
        CancelOutcome::Accepted => "Cancelado",
        CancelOutcome::NotActive => "Nenhum download ativo",
    };
    Json(json!({ "success": matches!(outcome, CancelOutcome::Accepted), "message": message }))
}

pub async fn download_health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "active_downloads": state.pipeline.active_count().await }))
}
