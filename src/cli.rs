// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::path::PathBuf;

use clap::Parser;

/// Control plane for a local LLM serving host.
#[derive(Parser, Debug)]
#[command(name = "llmhost", version)]
pub struct Cli {
    /// Path to the YAML config file. Searched in standard locations if omitted.
    #[arg(long, short = 'c', env = "LLMHOST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind the HTTP/WebSocket server to.
    #[arg(long, env = "LLMHOST_BIND")]
    pub bind: Option<String>,

    /// Readonly directory the chat engine loads model files from.
    #[arg(long, env = "LLMHOST_MODELS_DIR")]
    pub models_dir: Option<PathBuf>,

    /// Directory finished downloads are written to.
    #[arg(long, env = "LLMHOST_DOWNLOAD_DIR")]
    pub download_dir: Option<PathBuf>,

    /// Directory in-flight downloads stage their `.tmp` files in.
    #[arg(long, env = "LLMHOST_TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Path to the model catalog JSON document.
    #[arg(long, env = "LLMHOST_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Path to the active-model registry record.
    #[arg(long, env = "LLMHOST_REGISTRY_PATH")]
    pub registry_path: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}
