// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
mod engine;
mod protocol;
mod service;
mod session;

pub use engine::{FakeEngine, InferenceEngine};
pub use protocol::{InboundMessage, OutboundMessage};
pub use service::{ChatError, ChatSessionEngine};
pub use session::{ChatSession, HistoryEntry, Role};
