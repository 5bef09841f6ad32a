// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Model-switching and model-directory inspection. This sits above the
//! active-model registry: it resolves a requested model name against the
//! (readonly) model directory before letting the registry record the switch.

use std::path::{Path, PathBuf};

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use walkdir::WalkDir;

use llmhost_registry::SetOutcome;

use crate::error::NodeError;
use crate::AppState;

const MODEL_EXTENSIONS: &[&str] = &["gguf", "bin", "ggml"];

#[derive(Debug, Deserialize)]
pub struct SwitchModelRequest {
    pub model_name: String,
}

#[derive(Debug, Serialize)]
pub struct SwitchModelResponse {
    pub status: String,
    pub current_model: String,
    pub message: String,
    pub needs_restart: bool,
}

/// Resolves a model name against the readonly directory, accepting the exact
/// file name, the name with one of the known extensions appended, or a
/// directory by that name containing at least one matching file.
fn resolve_model_path(models_dir: &Path, name: &str) -> Option<PathBuf> {
    let exact = models_dir.join(name);
    if exact.is_file() {
        return Some(exact);
    }
    for ext in MODEL_EXTENSIONS {
        let candidate = models_dir.join(format!("{name}.{ext}"));
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    if exact.is_dir() {
        let has_model_file = WalkDir::new(&exact)
            .into_iter()
            .filter_map(Result::ok)
            .any(|entry| {
                entry.file_type().is_file()
                    && entry
                        .path()
                        .extension()
                        .and_then(|e| e.to_str())
                        .map(|e| MODEL_EXTENSIONS.contains(&e))
                        .unwrap_or(false)
            });
        if has_model_file {
            return Some(exact);
        }
    }
    None
}

pub async fn switch_model(
    State(state): State<AppState>,
    Json(req): Json<SwitchModelRequest>,
) -> Result<Json<SwitchModelResponse>, NodeError> {
    if resolve_model_path(&state.models_dir, &req.model_name).is_none() {
        return Err(NodeError::NotFound(format!(
            "model {:?} not found under the model directory",
            req.model_name
        )));
    }

    let outcome = state.registry.set_current(&req.model_name)?;
    let response = match outcome {
        SetOutcome::Unchanged => SwitchModelResponse {
            status: "already_active".to_string(),
            current_model: req.model_name,
            message: "model is already active".to_string(),
            needs_restart: false,
        },
        SetOutcome::Changed => SwitchModelResponse {
            status: "switched".to_string(),
            current_model: req.model_name,
            message: "active model updated".to_string(),
            needs_restart: true,
        },
    };
    Ok(Json(response))
}

pub async fn available_models(State(state): State<AppState>) -> Json<serde_json::Value> {
    let mut names: Vec<String> = WalkDir::new(&state.models_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| MODEL_EXTENSIONS.contains(&e))
                    .unwrap_or(false)
        })
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    Json(json!({
        "status": "ok",
        "available_models": names,
        "models_directory": state.models_dir.display().to_string(),
        "readonly": true,
    }))
}

pub async fn model_health(State(state): State<AppState>) -> Result<Json<serde_json::Value>, NodeError> {
    let current = state.registry.read_current()?;
    Ok(Json(json!({
        "status": "ok",
        "service": "llmhost",
        "version": env!("CARGO_PKG_VERSION"),
        "models_directory": state.models_dir.display().to_string(),
        "config_file": state.config_file.display().to_string(),
        "current_model": current,
        "readonly_models": true,
    })))
}
