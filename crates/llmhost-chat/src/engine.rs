// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The inference engine boundary. The real engine (model loading, sampling)
//! is an external collaborator — this trait is the seam the chat session
//! engine depends on, so tests run against a deterministic fake.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::session::HistoryEntry;

/// A blocking-by-nature call that starts a generation and hands back a
/// pull-style token stream. Implementations are expected to run their
/// blocking initiator on a worker pool (`tokio::task::spawn_blocking`) and
/// forward tokens into the returned channel — the chat session engine only
/// ever awaits on it.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    async fn generate(&self, history: &[HistoryEntry]) -> mpsc::Receiver<String>;
}

/// Deterministic test double: streams a fixed sentence token-by-token with a
/// small delay between tokens, so cancellation mid-stream is exercisable.
pub struct FakeEngine {
    pub tokens: Vec<String>,
    pub delay: std::time::Duration,
}

impl FakeEngine {
    pub fn new(sentence: &str) -> Self {
        Self {
            tokens: sentence.split_whitespace().map(|s| format!("{s} ")).collect(),
            delay: std::time::Duration::from_millis(1),
        }
    }
}

#[async_trait]
impl InferenceEngine for FakeEngine {
    async fn generate(&self, _history: &[HistoryEntry]) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(16);
        let tokens = self.tokens.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            for token in tokens {
                tokio::time::sleep(delay).await;
                if tx.send(token).await.is_err() {
                    return;
                }
            }
        });
        rx
    }
}
