// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The download pipeline: a per-model state machine that drives an external
//! fetcher through ordered mirror methods with retry and fallback, emitting
//! a typed event stream.

mod events;
mod progress;
mod state;
mod subprocess;
pub mod validation;

pub use events::DownloadEvent;
pub use state::ActiveDownloads;

use std::path::{Path, PathBuf};
use std::time::Duration;

use llmhost_catalog::Catalog;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    pub id: String,
    pub name: String,
    pub filename: String,
    pub size_gb: f64,
    pub is_downloaded: bool,
    pub is_downloading: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelStatusDetail {
    pub id: String,
    pub name: String,
    pub is_downloaded: bool,
    pub is_downloading: bool,
    pub progress: u32,
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Accepted,
    NotActive,
}

/// Owns the catalog and filesystem locations; one `Pipeline` serves every
/// model in the catalog, tracking at most one in-flight download per id.
#[derive(Clone)]
pub struct Pipeline {
    catalog: Arc<Catalog>,
    download_dir: PathBuf,
    temp_dir: PathBuf,
    active: ActiveDownloads,
    max_retries: u32,
    retry_backoff: Duration,
}

impl Pipeline {
    pub fn new(
        catalog: Arc<Catalog>,
        download_dir: impl Into<PathBuf>,
        temp_dir: impl Into<PathBuf>,
        max_retries: u32,
        retry_backoff: Duration,
    ) -> Self {
        Self {
            catalog,
            download_dir: download_dir.into(),
            temp_dir: temp_dir.into(),
            active: ActiveDownloads::default(),
            max_retries: max_retries.max(1),
            retry_backoff,
        }
    }

    fn final_path(&self, filename: &str) -> PathBuf {
        self.download_dir.join(filename)
    }

    pub async fn list(&self) -> Vec<ModelStatus> {
        let mut out = Vec::new();
        for model in self.catalog.iter() {
            let is_downloaded = self.final_path(&model.filename).exists();
            let is_downloading = self.active.is_active(&model.id).await;
            out.push(ModelStatus {
                id: model.id.clone(),
                name: model.display_name.clone(),
                filename: model.filename.clone(),
                size_gb: model.expected_size_gb,
                is_downloaded,
                is_downloading,
            });
        }
        out
    }

    pub async fn status(&self, id: &str) -> Option<ModelStatusDetail> {
        let model = self.catalog.lookup(id)?;
        let file_path = self.final_path(&model.filename);
        let is_downloaded = file_path.exists();
        let progress = self.active.progress_of(id).await.unwrap_or(0);
        Some(ModelStatusDetail {
            id: model.id.clone(),
            name: model.display_name.clone(),
            is_downloaded,
            is_downloading: self.active.is_active(id).await,
            progress,
            file_path: is_downloaded.then(|| file_path.display().to_string()),
        })
    }

    pub async fn active_count(&self) -> usize {
        self.active.count().await
    }

    /// Signals the in-flight download for `id` to stop. Cleanup (process
    /// kill, `.tmp` pruning) happens asynchronously on the download's own
    /// task and on a short grace-period sweep spawned here.
    pub async fn cancel(&self, id: &str) -> CancelOutcome {
        if self.active.cancel(id).await {
            let temp_dir = self.temp_dir.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                prune_tmp_files(&temp_dir);
            });
            CancelOutcome::Accepted
        } else {
            CancelOutcome::NotActive
        }
    }

    /// Starts (or reports a validation failure for) a download of `id`,
    /// returning a finite event stream that ends with exactly one of
    /// `completed | cancelled | error`.
    pub fn download(&self, id: &str) -> ReceiverStream<DownloadEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let pipeline = self.clone();
        let id = id.to_string();
        tokio::spawn(async move {
            pipeline.run_download(id, tx).await;
        });
        ReceiverStream::new(rx)
    }

    async fn run_download(&self, id: String, tx: mpsc::Sender<DownloadEvent>) {
        let emit = |ev: DownloadEvent| {
            let _ = tx.try_send(ev);
        };

        if !validation::validate_model_id(&id) {
            emit(DownloadEvent::Error {
                message: "invalid model id".to_string(),
            });
            return;
        }

        let Some(model) = self.catalog.lookup(&id).cloned() else {
            emit(DownloadEvent::Error {
                message: "model not found".to_string(),
            });
            return;
        };

        let Some((handle, progress_cell)) = self.active.register(&id).await else {
            emit(DownloadEvent::Error {
                message: "download already in progress".to_string(),
            });
            return;
        };

        let final_file = self.final_path(&model.filename);
        if final_file.exists() {
            emit(DownloadEvent::Completed {
                progress: 100,
                method: "cached".to_string(),
            });
            self.active.unregister(&id).await;
            return;
        }

        if let Some(parent) = final_file.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = std::fs::create_dir_all(&self.temp_dir);

        emit(DownloadEvent::Started {
            model_id: id.clone(),
            model_name: model.display_name.clone(),
        });

        let method_count = model.methods.len();
        for (idx, method) in model.methods.iter().enumerate() {
            let kind_label = match method.kind {
                llmhost_catalog::TransferKind::Wget => "wget",
                llmhost_catalog::TransferKind::Curl => "curl",
            };
            emit(DownloadEvent::Info {
                message: format!("method {}/{}: {kind_label}", idx + 1, method_count),
            });

            if validation::url_has_forbidden_chars(&method.url)
                || !validation::validate_url(&method.url, &self.catalog)
            {
                emit(DownloadEvent::Warning {
                    message: format!("url not allowed for method {kind_label}"),
                });
                continue;
            }
            if !validation::validate_filename(&model.filename) {
                emit(DownloadEvent::Error {
                    message: "invalid filename".to_string(),
                });
                self.active.unregister(&id).await;
                return;
            }

            let temp_file = self.temp_dir.join(format!("{}.tmp", model.filename));

            for retry in 0..self.max_retries {
                if retry > 0 {
                    emit(DownloadEvent::Info {
                        message: format!("attempt {}/{}", retry + 1, self.max_retries),
                    });
                    tokio::time::sleep(self.retry_backoff).await;
                }

                let cmd = subprocess::build_command(&method.kind, &method.url, &temp_file);
                let child = match cmd_spawn(cmd) {
                    Ok(c) => c,
                    Err(_) => {
                        if retry + 1 == self.max_retries {
                            emit(DownloadEvent::Warning {
                                message: format!("failed to spawn {kind_label} after {} attempts", self.max_retries),
                            });
                        }
                        continue;
                    }
                };

                let cancel_rx = handle.cancel_tx.subscribe();
                let progress_cell_for_run = progress_cell.clone();
                let outcome = subprocess::supervise(
                    child,
                    kind_label,
                    model.expected_size_gb,
                    cancel_rx,
                    |ev| {
                        if let DownloadEvent::Progress { progress, .. } = &ev {
                            progress_cell_for_run.store(*progress, std::sync::atomic::Ordering::Relaxed);
                        }
                        emit(ev);
                    },
                )
                .await;

                match outcome {
                    subprocess::RunOutcome::Completed => {
                        let _ = std::fs::rename(&temp_file, &final_file);
                        emit(DownloadEvent::Completed {
                            progress: 100,
                            method: kind_label.to_string(),
                        });
                        self.active.unregister(&id).await;
                        return;
                    }
                    subprocess::RunOutcome::Cancelled => {
                        emit(DownloadEvent::Cancelled {
                            message: "cancelled by caller".to_string(),
                        });
                        self.active.unregister(&id).await;
                        return;
                    }
                    subprocess::RunOutcome::Failed { .. } => {
                        let _ = std::fs::remove_file(&temp_file);
                        if retry + 1 == self.max_retries {
                            emit(DownloadEvent::Warning {
                                message: format!("failed after {} attempts", self.max_retries),
                            });
                        }
                    }
                }
            }
        }

        emit(DownloadEvent::Error {
            message: "all methods failed".to_string(),
        });
        self.active.unregister(&id).await;
    }
}

fn cmd_spawn(mut cmd: tokio::process::Command) -> std::io::Result<tokio::process::Child> {
    cmd.spawn()
}

fn prune_tmp_files(temp_dir: &Path) {
    let Ok(entries) = std::fs::read_dir(temp_dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("tmp") {
            let _ = std::fs::remove_file(&path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llmhost_catalog::Catalog;
    use std::io::Write;
    use tokio_stream::StreamExt;

    fn write_catalog(dir: &Path, methods_json: &str) -> Arc<Catalog> {
        let doc = format!(
            r#"{{
                "download_path": "{download}",
                "temp_path": "{temp}",
                "log_path": "logs",
                "allowed_domains": ["example.com"],
                "models": [
                    {{"id": "foo", "name": "Foo", "filename": "foo.gguf", "size_gb": 0.001, "methods": {methods}}}
                ]
            }}"#,
            download = dir.join("downloads").display(),
            temp = dir.join("tmp").display(),
            methods = methods_json,
        );
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{}", doc).unwrap();
        Arc::new(Catalog::load(f.path()).unwrap())
    }

    async fn collect(mut stream: ReceiverStream<DownloadEvent>) -> Vec<DownloadEvent> {
        let mut out = Vec::new();
        while let Some(ev) = stream.next().await {
            let terminal = ev.is_terminal();
            out.push(ev);
            if terminal {
                break;
            }
        }
        out
    }

    #[tokio::test]
    async fn unknown_model_id_yields_error_only() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = write_catalog(dir.path(), "[]");
        let pipeline = Pipeline::new(catalog, dir.path().join("downloads"), dir.path().join("tmp"), 2, Duration::from_millis(10));
        let events = collect(pipeline.download("ghost")).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], DownloadEvent::Error { .. }));
    }

    #[tokio::test]
    async fn invalid_id_is_rejected_before_catalog_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = write_catalog(dir.path(), "[]");
        let pipeline = Pipeline::new(catalog, dir.path().join("downloads"), dir.path().join("tmp"), 2, Duration::from_millis(10));
        let events = collect(pipeline.download("bad id!")).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], DownloadEvent::Error { .. }));
    }

    #[tokio::test]
    async fn status_of_unknown_id_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = write_catalog(dir.path(), "[]");
        let pipeline = Pipeline::new(catalog, dir.path().join("downloads"), dir.path().join("tmp"), 2, Duration::from_millis(10));
        assert!(pipeline.status("ghost").await.is_none());
    }

    #[tokio::test]
    async fn cancel_of_inactive_id_is_not_active() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = write_catalog(dir.path(), "[]");
        let pipeline = Pipeline::new(catalog, dir.path().join("downloads"), dir.path().join("tmp"), 2, Duration::from_millis(10));
        assert_eq!(pipeline.cancel("foo").await, CancelOutcome::NotActive);
    }
}
