// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The per-connection chat session actor. A `ChatSessionEngine` owns a
//! `ChatSession` exclusively — history and `active_prompts` are mutated only
//! here, never from the spawned generation tasks, so there is no lock around
//! the session itself. A prompt's tokens are pushed straight to the caller's
//! outbound sender from the generation task; only the terminal outcome
//! (finished / cancelled) is relayed back through an internal channel so the
//! actor can update history and answer with exactly one `complete` message.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::engine::InferenceEngine;
use crate::protocol::{InboundMessage, OutboundMessage};
use crate::session::ChatSession;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("malformed message: {0}")]
    Malformed(String),
}

enum Internal {
    Finished {
        prompt_id: String,
        prompt_text: String,
        response: String,
    },
    Cancelled {
        prompt_id: String,
    },
}

/// Drives one chat connection's lifecycle: prompt admission, generation
/// dispatch, cancellation, and history bookkeeping.
pub struct ChatSessionEngine {
    session: ChatSession,
    cancel_flags: HashMap<String, Arc<AtomicBool>>,
    engine: Arc<dyn InferenceEngine>,
    max_active_prompts: usize,
    out_tx: mpsc::Sender<OutboundMessage>,
    internal_tx: mpsc::Sender<Internal>,
    internal_rx: mpsc::Receiver<Internal>,
}

impl ChatSessionEngine {
    /// Builds a new session and returns the `ready` message the caller
    /// should send immediately on connect.
    pub fn new(
        preamble: impl Into<String>,
        engine: Arc<dyn InferenceEngine>,
        max_active_prompts: usize,
        out_tx: mpsc::Sender<OutboundMessage>,
    ) -> (Self, OutboundMessage) {
        let session_id = short_id();
        let session = ChatSession::new(session_id.clone(), preamble);
        let (internal_tx, internal_rx) = mpsc::channel(32);
        let ready = OutboundMessage::Ready {
            session_id,
            message: "Model is ready".to_string(),
        };
        (
            Self {
                session,
                cancel_flags: HashMap::new(),
                engine,
                max_active_prompts,
                out_tx,
                internal_tx,
                internal_rx,
            },
            ready,
        )
    }

    pub fn session_id(&self) -> &str {
        &self.session.session_id
    }

    /// Parses one inbound text frame and dispatches it. Unknown `action`
    /// values and malformed JSON both produce an `error` reply rather than
    /// being dropped silently.
    pub async fn handle_text(&mut self, raw: &str) -> Option<OutboundMessage> {
        let value: serde_json::Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => return Some(self.malformed(e.to_string())),
        };
        match serde_json::from_value::<InboundMessage>(value.clone()) {
            Ok(msg) => self.handle_inbound(msg).await,
            Err(e) => match value.get("action").and_then(|a| a.as_str()) {
                Some(action) => Some(OutboundMessage::Error {
                    prompt_id: None,
                    error: format!("Unknown action: {action}"),
                }),
                None => Some(self.malformed(e.to_string())),
            },
        }
    }

    fn malformed(&self, detail: String) -> OutboundMessage {
        OutboundMessage::Error {
            prompt_id: None,
            error: format!("malformed message: {detail}"),
        }
    }

    pub async fn handle_inbound(&mut self, msg: InboundMessage) -> Option<OutboundMessage> {
        match msg {
            InboundMessage::Prompt { prompt, prompt_id } => self.handle_prompt(prompt, prompt_id).await,
            InboundMessage::Cancel { prompt_id } => self.handle_cancel(prompt_id),
            InboundMessage::ClearHistory => self.handle_clear_history(),
        }
    }

    async fn handle_prompt(&mut self, prompt: String, prompt_id: Option<String>) -> Option<OutboundMessage> {
        let prompt = prompt.trim().to_string();
        if prompt.is_empty() {
            return Some(OutboundMessage::Error {
                prompt_id: None,
                error: "Empty prompt".to_string(),
            });
        }
        if self.session.active_prompts.len() > self.max_active_prompts {
            return Some(OutboundMessage::Error {
                prompt_id,
                error: "Too many active prompts".to_string(),
            });
        }

        let prompt_id = prompt_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        self.session.active_prompts.insert(prompt_id.clone());
        let flag = Arc::new(AtomicBool::new(false));
        self.cancel_flags.insert(prompt_id.clone(), flag.clone());

        let history = self.session.history_with_prompt(&prompt);
        let engine = self.engine.clone();
        let out_tx = self.out_tx.clone();
        let internal_tx = self.internal_tx.clone();
        let task_prompt_id = prompt_id.clone();
        let task_prompt_text = prompt.clone();

        tokio::spawn(async move {
            let mut rx = engine.generate(&history).await;
            let mut accumulated = String::new();
            loop {
                tokio::task::yield_now().await;
                if flag.load(Ordering::Relaxed) {
                    let _ = internal_tx
                        .send(Internal::Cancelled {
                            prompt_id: task_prompt_id,
                        })
                        .await;
                    return;
                }
                match rx.recv().await {
                    Some(token) => {
                        accumulated.push_str(&token);
                        if out_tx
                            .send(OutboundMessage::Token {
                                prompt_id: task_prompt_id.clone(),
                                token,
                            })
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                    None => break,
                }
            }
            let _ = internal_tx
                .send(Internal::Finished {
                    prompt_id: task_prompt_id,
                    prompt_text: task_prompt_text,
                    response: accumulated,
                })
                .await;
        });

        Some(OutboundMessage::Started {
            prompt_id,
            session_id: self.session.session_id.clone(),
            status: "started".to_string(),
        })
    }

    fn handle_cancel(&mut self, prompt_id: String) -> Option<OutboundMessage> {
        let was_active = self.session.active_prompts.remove(&prompt_id);
        if let Some(flag) = self.cancel_flags.get(&prompt_id) {
            flag.store(true, Ordering::Relaxed);
        }
        Some(OutboundMessage::Status {
            prompt_id: Some(prompt_id),
            status: if was_active { "canceled" } else { "not_active" }.to_string(),
        })
    }

    fn handle_clear_history(&mut self) -> Option<OutboundMessage> {
        self.session.clear_history();
        Some(OutboundMessage::MemoryCleared {
            session_id: self.session.session_id.clone(),
            status: "history_cleared".to_string(),
        })
    }

    /// Awaits the next terminal generation outcome and turns it into the
    /// reply to send, mutating history on successful completion. The caller
    /// selects on this alongside the socket's inbound stream.
    pub async fn next_terminal_event(&mut self) -> OutboundMessage {
        loop {
            let event = match self.internal_rx.recv().await {
                Some(e) => e,
                None => std::future::pending().await,
            };
            match event {
                Internal::Finished {
                    prompt_id,
                    prompt_text,
                    response,
                } => {
                    self.cancel_flags.remove(&prompt_id);
                    if self.session.active_prompts.remove(&prompt_id) {
                        self.session.record_completion(&prompt_text, &response);
                        return OutboundMessage::Complete {
                            prompt_id,
                            complete: true,
                        };
                    }
                }
                Internal::Cancelled { prompt_id } => {
                    self.cancel_flags.remove(&prompt_id);
                    return OutboundMessage::Complete {
                        prompt_id,
                        complete: true,
                    };
                }
            }
        }
    }

    pub fn active_prompt_count(&self) -> usize {
        self.session.active_prompts.len()
    }
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}
