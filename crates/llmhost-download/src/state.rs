// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! In-memory bookkeeping for active downloads. Because this rewrite runs on
//! a real multi-threaded executor (unlike the single-threaded source), the
//! map is behind a `Mutex` rather than relying on single-writer discipline —
//! see the "Shared mutable maps without locks" design note.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};

/// Handle to one in-flight download, shared between the pipeline task that
/// owns it and any concurrent `status()`/`cancel()` caller.
pub struct DownloadHandle {
    pub cancel_tx: watch::Sender<bool>,
    progress: Arc<AtomicU32>,
}

impl DownloadHandle {
    pub fn progress(&self) -> u32 {
        self.progress.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Default)]
pub struct ActiveDownloads {
    inner: Arc<Mutex<HashMap<String, Arc<DownloadHandle>>>>,
}

impl ActiveDownloads {
    /// Registers `model_id` as active, returning the handle and a progress
    /// cell the caller updates as it parses fetcher output. Fails (returns
    /// `None`) if a download for this id is already in flight — enforces
    /// "at most one session per model_id".
    pub async fn register(&self, model_id: &str) -> Option<(Arc<DownloadHandle>, Arc<AtomicU32>)> {
        let mut guard = self.inner.lock().await;
        if guard.contains_key(model_id) {
            return None;
        }
        let (cancel_tx, _rx) = watch::channel(false);
        let progress = Arc::new(AtomicU32::new(0));
        let handle = Arc::new(DownloadHandle {
            cancel_tx,
            progress: progress.clone(),
        });
        guard.insert(model_id.to_string(), handle.clone());
        Some((handle, progress))
    }

    pub async fn unregister(&self, model_id: &str) {
        self.inner.lock().await.remove(model_id);
    }

    pub async fn is_active(&self, model_id: &str) -> bool {
        self.inner.lock().await.contains_key(model_id)
    }

    pub async fn progress_of(&self, model_id: &str) -> Option<u32> {
        self.inner.lock().await.get(model_id).map(|h| h.progress())
    }

    /// Signals cancellation. Returns `false` if no download for this id is
    /// active (caller reports `not_active`).
    pub async fn cancel(&self, model_id: &str) -> bool {
        let guard = self.inner.lock().await;
        match guard.get(model_id) {
            Some(handle) => {
                let _ = handle.cancel_tx.send(true);
                true
            }
            None => false,
        }
    }

    pub async fn count(&self) -> usize {
        self.inner.lock().await.len()
    }
}
