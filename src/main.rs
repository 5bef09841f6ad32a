// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::Cli;
use llmhost_chat::FakeEngine;
use llmhost_download::Pipeline;
use llmhost_node::AppState;
use llmhost_registry::Registry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = llmhost_config::load(cli.config.as_deref()).context("loading configuration")?;

    let bind = cli.bind.unwrap_or(config.http.bind);
    let models_dir = cli.models_dir.unwrap_or_else(|| config.paths.models_dir.into());
    let download_dir = cli.download_dir.unwrap_or_else(|| config.paths.download_dir.into());
    let temp_dir = cli.temp_dir.unwrap_or_else(|| config.paths.temp_dir.into());
    let catalog_path = cli.catalog.unwrap_or_else(|| config.paths.catalog_path.into());
    let registry_path = cli.registry_path.unwrap_or_else(|| config.paths.registry_path.into());

    let catalog = match llmhost_catalog::Catalog::load(&catalog_path) {
        Ok(catalog) => Arc::new(catalog),
        Err(e) => {
            tracing::error!(catalog = %catalog_path.display(), "fatal: failed to load model catalog: {e}");
            std::process::exit(1);
        }
    };

    let registry = Registry::new(registry_path);
    let pipeline = Pipeline::new(
        catalog,
        download_dir,
        temp_dir,
        config.download.max_retries,
        std::time::Duration::from_secs(config.download.retry_backoff_secs),
    );

    warn!(
        "no inference engine wired in — chat sessions are served by a placeholder echo \
         engine until the real model-serving backend is integrated"
    );

    let state = AppState {
        registry,
        pipeline,
        inference_engine: Arc::new(FakeEngine::new(
            "This is a placeholder response from the local model.",
        )),
        models_dir,
        config_file: cli.config.unwrap_or_default(),
        max_active_prompts: config.chat.max_active_prompts,
        chat_preamble: config.chat.default_preamble,
    };

    let router = llmhost_node::build_router(state);

    info!(%bind, "starting llmhost control plane");
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    axum::serve(listener, router).await.context("HTTP server error")?;

    Ok(())
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}
