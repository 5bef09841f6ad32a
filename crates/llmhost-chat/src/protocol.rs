// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Wire protocol for the chat connection. Inbound messages are tagged by
//! `action`; outbound messages are tagged by `type`. Both sides are JSON —
//! the actual framing (WebSocket) is an external collaborator.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum InboundMessage {
    Prompt {
        prompt: String,
        #[serde(rename = "promptId", default)]
        prompt_id: Option<String>,
    },
    Cancel {
        #[serde(rename = "promptId")]
        prompt_id: String,
    },
    ClearHistory,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundMessage {
    Ready {
        session_id: String,
        message: String,
    },
    Started {
        prompt_id: String,
        session_id: String,
        status: String,
    },
    Token {
        prompt_id: String,
        token: String,
    },
    Complete {
        prompt_id: String,
        complete: bool,
    },
    Status {
        #[serde(skip_serializing_if = "Option::is_none")]
        prompt_id: Option<String>,
        status: String,
    },
    #[serde(rename = "memory_cleared")]
    MemoryCleared {
        session_id: String,
        status: String,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        prompt_id: Option<String>,
        error: String,
    },
}

impl OutboundMessage {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("OutboundMessage is serializable")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_prompt_parses_camel_case_prompt_id() {
        let msg: InboundMessage =
            serde_json::from_str(r#"{"action":"prompt","prompt":"hi","promptId":"p1"}"#).unwrap();
        match msg {
            InboundMessage::Prompt { prompt, prompt_id } => {
                assert_eq!(prompt, "hi");
                assert_eq!(prompt_id.as_deref(), Some("p1"));
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn inbound_prompt_without_id_is_none() {
        let msg: InboundMessage = serde_json::from_str(r#"{"action":"prompt","prompt":"hi"}"#).unwrap();
        match msg {
            InboundMessage::Prompt { prompt_id, .. } => assert!(prompt_id.is_none()),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn inbound_cancel_parses() {
        let msg: InboundMessage =
            serde_json::from_str(r#"{"action":"cancel","promptId":"p1"}"#).unwrap();
        assert!(matches!(msg, InboundMessage::Cancel { prompt_id } if prompt_id == "p1"));
    }

    #[test]
    fn inbound_clear_history_parses() {
        let msg: InboundMessage = serde_json::from_str(r#"{"action":"clear_history"}"#).unwrap();
        assert!(matches!(msg, InboundMessage::ClearHistory));
    }

    #[test]
    fn unknown_action_fails_to_parse() {
        let result: Result<InboundMessage, _> = serde_json::from_str(r#"{"action":"nuke"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn outbound_ready_shape() {
        let msg = OutboundMessage::Ready {
            session_id: "abcd1234".into(),
            message: "Model is ready".into(),
        };
        let json = msg.to_json();
        assert!(json.contains("\"type\":\"ready\""));
        assert!(json.contains("\"sessionId\":\"abcd1234\""));
    }

    #[test]
    fn outbound_memory_cleared_tag_is_snake_case() {
        let msg = OutboundMessage::MemoryCleared {
            session_id: "s1".into(),
            status: "history_cleared".into(),
        };
        assert!(msg.to_json().contains("\"type\":\"memory_cleared\""));
    }

    #[test]
    fn outbound_error_omits_prompt_id_when_absent() {
        let msg = OutboundMessage::Error {
            prompt_id: None,
            error: "Unknown action: nuke".into(),
        };
        let json = msg.to_json();
        assert!(!json.contains("promptId"));
    }
}
