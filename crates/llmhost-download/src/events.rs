// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use serde::Serialize;

/// Typed events pushed by the download state machine; the HTTP layer frames
/// each one as an SSE `data:` line. Exactly one of `Completed`, `Cancelled`,
/// `Error` terminates a given `download()` call's stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DownloadEvent {
    Started {
        model_id: String,
        model_name: String,
    },
    Info {
        message: String,
    },
    Progress {
        progress: u32,
        speed_mbps: f64,
        eta_seconds: u64,
        method: String,
    },
    Warning {
        message: String,
    },
    Completed {
        progress: u32,
        method: String,
    },
    Cancelled {
        message: String,
    },
    Error {
        message: String,
    },
}

impl DownloadEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DownloadEvent::Completed { .. } | DownloadEvent::Cancelled { .. } | DownloadEvent::Error { .. }
        )
    }

    /// Render as an SSE frame: `data: <json>\n\n`.
    pub fn to_sse_frame(&self) -> String {
        let body = serde_json::to_string(self).expect("DownloadEvent is serializable");
        format!("data: {body}\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_classification() {
        assert!(DownloadEvent::Completed { progress: 100, method: "wget".into() }.is_terminal());
        assert!(DownloadEvent::Cancelled { message: "x".into() }.is_terminal());
        assert!(DownloadEvent::Error { message: "x".into() }.is_terminal());
        assert!(!DownloadEvent::Started { model_id: "a".into(), model_name: "b".into() }.is_terminal());
        assert!(!DownloadEvent::Info { message: "x".into() }.is_terminal());
    }

    #[test]
    fn sse_frame_shape() {
        let ev = DownloadEvent::Progress {
            progress: 50,
            speed_mbps: 1.5,
            eta_seconds: 10,
            method: "wget".into(),
        };
        let frame = ev.to_sse_frame();
        assert!(frame.starts_with("data: "));
        assert!(frame.ends_with("\n\n"));
        assert!(frame.contains("\"type\":\"progress\""));
    }
}
