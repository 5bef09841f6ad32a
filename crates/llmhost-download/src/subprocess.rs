// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Transfer-process supervision: spawn the external fetcher, poll its
//! stderr for progress with a 500ms read timeout, and react to cancellation
//! at each timeout tick.

use std::process::Stdio;
use std::time::{Duration, Instant};

use llmhost_catalog::TransferKind;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;

use crate::events::DownloadEvent;
use crate::progress::{parse_percent, throughput};

const STDERR_POLL_TIMEOUT: Duration = Duration::from_millis(500);

/// Builds the argv for one of the two supported fetcher shapes. No shell is
/// involved — arguments are passed directly to `exec`, so shell
/// metacharacters in `url` cannot do anything even without the separate
/// [`crate::validation::url_has_forbidden_chars`] check.
pub fn build_command(kind: &TransferKind, url: &str, output_path: &std::path::Path) -> Command {
    let mut cmd = match kind {
        TransferKind::Wget => {
            let mut c = Command::new("wget");
            c.arg("-c").arg("--progress=dot:giga").arg("-O").arg(output_path).arg(url);
            c
        }
        TransferKind::Curl => {
            let mut c = Command::new("curl");
            c.arg("-L").arg("-C").arg("-").arg("--progress-bar").arg("-o").arg(output_path).arg(url);
            c
        }
    };
    cmd.stdout(Stdio::null()).stderr(Stdio::piped());
    cmd
}

#[derive(Debug)]
pub enum RunOutcome {
    /// Process exited 0 and was not cancelled.
    Completed,
    /// The cancel signal was observed before the process exited.
    Cancelled,
    /// Process exited non-zero (transient — the retry loop decides what's next).
    Failed { exit_code: Option<i32> },
}

/// Drives one spawned fetcher to completion, emitting `Progress` events
/// through `on_event` as they're derived from stderr. Returns the terminal
/// outcome once the process has actually exited (or been killed).
pub async fn supervise(
    mut child: Child,
    method: &str,
    expected_size_gb: f64,
    mut cancel_rx: watch::Receiver<bool>,
    mut on_event: impl FnMut(DownloadEvent),
) -> RunOutcome {
    let stderr = child.stderr.take().expect("stderr piped at spawn");
    let mut lines = BufReader::new(stderr).lines();

    let start = Instant::now();
    let mut last_progress: Option<u32> = None;

    loop {
        if *cancel_rx.borrow() {
            let _ = child.kill().await;
            let _ = child.wait().await;
            return RunOutcome::Cancelled;
        }

        match tokio::time::timeout(STDERR_POLL_TIMEOUT, lines.next_line()).await {
            Ok(Ok(Some(line))) => {
                if let Some(progress) = parse_percent(&line) {
                    let delta = last_progress.map(|p| progress.abs_diff(p)).unwrap_or(u32::MAX);
                    if delta >= 1 {
                        let elapsed = start.elapsed().as_secs_f64();
                        let (speed_mbps, eta_seconds) = throughput(progress, expected_size_gb, elapsed);
                        on_event(DownloadEvent::Progress {
                            progress,
                            speed_mbps,
                            eta_seconds,
                            method: method.to_string(),
                        });
                        last_progress = Some(progress);
                    }
                }
            }
            Ok(Ok(None)) => {
                // stderr closed; fall through to wait for process exit.
                break;
            }
            Ok(Err(_)) => break,
            Err(_timeout) => {
                // 500ms tick with nothing new on stderr: this is also the
                // scheduler-yield point cancellation depends on, already
                // checked at the top of the loop.
                if let Ok(Some(_)) = child.try_wait() {
                    break;
                }
                continue;
            }
        }
    }

    if *cancel_rx.borrow() {
        let _ = child.kill().await;
        let _ = child.wait().await;
        return RunOutcome::Cancelled;
    }

    match child.wait().await {
        Ok(status) if status.success() => RunOutcome::Completed,
        Ok(status) => RunOutcome::Failed {
            exit_code: status.code(),
        },
        Err(_) => RunOutcome::Failed { exit_code: None },
    }
}
