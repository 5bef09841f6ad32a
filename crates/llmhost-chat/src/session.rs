// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Per-connection state: the first history entry is always the system
/// preamble. History is updated only on successful prompt completion —
/// never on cancel or error — giving "cancel leaves no trace" semantics.
#[derive(Debug, Clone)]
pub struct ChatSession {
    pub session_id: String,
    pub history: Vec<HistoryEntry>,
    pub active_prompts: HashSet<String>,
    preamble: String,
}

impl ChatSession {
    pub fn new(session_id: impl Into<String>, preamble: impl Into<String>) -> Self {
        let preamble = preamble.into();
        Self {
            session_id: session_id.into(),
            history: vec![HistoryEntry::system(preamble.clone())],
            active_prompts: HashSet::new(),
            preamble,
        }
    }

    /// Resets history to a single fresh system preamble. Does not touch
    /// `active_prompts` — in-flight generations are unaffected.
    pub fn clear_history(&mut self) {
        self.history = vec![HistoryEntry::system(self.preamble.clone())];
    }

    /// A copy of the stored history with the user's new turn appended — the
    /// exact sequence handed to the inference engine for one generation.
    pub fn history_with_prompt(&self, prompt: &str) -> Vec<HistoryEntry> {
        let mut copy = self.history.clone();
        copy.push(HistoryEntry::user(prompt));
        copy
    }

    pub fn record_completion(&mut self, prompt: &str, response: &str) {
        self.history.push(HistoryEntry::user(prompt));
        self.history.push(HistoryEntry::assistant(response));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_has_system_preamble_only() {
        let session = ChatSession::new("abcd1234", "be helpful");
        assert_eq!(session.history.len(), 1);
        assert_eq!(session.history[0].role, Role::System);
        assert_eq!(session.history[0].content, "be helpful");
    }

    #[test]
    fn record_completion_appends_user_then_assistant() {
        let mut session = ChatSession::new("s1", "pre");
        session.record_completion("hi", "hello there");
        assert_eq!(session.history.len(), 3);
        assert_eq!(session.history[1].role, Role::User);
        assert_eq!(session.history[2].role, Role::Assistant);
    }

    #[test]
    fn clear_history_resets_to_fresh_preamble_ignoring_active_prompts() {
        let mut session = ChatSession::new("s1", "pre");
        session.record_completion("hi", "hello");
        session.active_prompts.insert("p1".to_string());
        session.clear_history();
        assert_eq!(session.history.len(), 1);
        assert_eq!(session.active_prompts.len(), 1, "clear_history must not cancel in-flight prompts");
    }

    #[test]
    fn history_with_prompt_does_not_mutate_stored_history() {
        let session = ChatSession::new("s1", "pre");
        let copy = session.history_with_prompt("hi");
        assert_eq!(copy.len(), 2);
        assert_eq!(session.history.len(), 1, "stored history must remain untouched until completion");
    }
}
