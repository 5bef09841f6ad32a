// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_models_dir() -> String {
    "models".to_string()
}

fn default_download_dir() -> String {
    "models".to_string()
}

fn default_temp_dir() -> String {
    "models/.tmp".to_string()
}

fn default_catalog_path() -> String {
    "config/catalog.json".to_string()
}

fn default_registry_path() -> String {
    "config/current_model.json".to_string()
}

fn default_max_active_prompts() -> usize {
    5
}

fn default_preamble() -> String {
    "You are a helpful, knowledgeable, and professional AI assistant.".to_string()
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff_secs() -> u64 {
    2
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub download: DownloadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Address the HTTP/WS server binds to, e.g. `0.0.0.0:8080`.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Filesystem locations the core reads and writes. All relative paths are
/// resolved against the current working directory at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_models_dir")]
    pub models_dir: String,
    #[serde(default = "default_download_dir")]
    pub download_dir: String,
    #[serde(default = "default_temp_dir")]
    pub temp_dir: String,
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,
    #[serde(default = "default_registry_path")]
    pub registry_path: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            download_dir: default_download_dir(),
            temp_dir: default_temp_dir(),
            catalog_path: default_catalog_path(),
            registry_path: default_registry_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Ceiling on concurrent in-flight prompts per session.
    #[serde(default = "default_max_active_prompts")]
    pub max_active_prompts: usize,
    /// System-role entry a fresh or cleared session starts from. Deliberately
    /// a configurable string — not normative — see history in the upstream
    /// Python variants this was distilled from.
    #[serde(default = "default_preamble")]
    pub default_preamble: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_active_prompts: default_max_active_prompts(),
            default_preamble: default_preamble(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Attempts per transfer method before falling back to the next one.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Sleep between retries of the same method.
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_backoff_secs: default_retry_backoff_secs(),
        }
    }
}
