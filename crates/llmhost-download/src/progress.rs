// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Pure arithmetic extracted from the supervision loop so it can be unit
//! tested without a subprocess: parsing a percentage out of a fetcher's
//! stderr line, and turning that percentage into throughput/ETA.

use regex::Regex;
use std::sync::OnceLock;

fn percent_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)%").expect("valid regex"))
}

/// Extracts the integer truncation of the first `<int-or-decimal>%` match in
/// a line, e.g. `"  42.7%  [===>  ] 1.2MB/s"` → `Some(42)`.
pub fn parse_percent(line: &str) -> Option<u32> {
    let caps = percent_re().captures(line)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    Some(value as u32)
}

/// `speed_mbps` and `eta_seconds` for a given progress percentage. Both are
/// zero if elapsed time or the derived rate is zero — there is nothing
/// meaningful to report yet.
pub fn throughput(progress: u32, expected_size_gb: f64, elapsed_secs: f64) -> (f64, u64) {
    if elapsed_secs <= 0.0 {
        return (0.0, 0);
    }

    let downloaded_mb = (progress as f64 / 100.0) * expected_size_gb * 1024.0;
    let speed_mbps = downloaded_mb / elapsed_secs;

    if speed_mbps <= 0.0 {
        return (0.0, 0);
    }

    let remaining_mb = (expected_size_gb * 1024.0) - downloaded_mb;
    let eta_seconds = (remaining_mb / speed_mbps).floor().max(0.0) as u64;
    (speed_mbps, eta_seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_integer_percent() {
        assert_eq!(parse_percent("downloaded 42%"), Some(42));
    }

    #[test]
    fn parses_decimal_percent_truncated() {
        assert_eq!(parse_percent("downloaded 42.9%"), Some(42));
    }

    #[test]
    fn no_percent_returns_none() {
        assert_eq!(parse_percent("Resolving huggingface.co..."), None);
    }

    #[test]
    fn zero_elapsed_yields_zero_throughput() {
        assert_eq!(throughput(50, 4.0, 0.0), (0.0, 0));
    }

    #[test]
    fn throughput_and_eta_are_consistent() {
        let (speed, eta) = throughput(50, 4.0, 100.0);
        assert!(speed > 0.0);
        assert!(eta > 0);
        // at 100% the remaining is ~0, so eta should collapse towards 0
        let (_, eta_full) = throughput(100, 4.0, 100.0);
        assert_eq!(eta_full, 0);
    }
}
