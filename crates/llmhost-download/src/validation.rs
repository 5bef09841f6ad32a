// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Validation executed before any external process is spawned. None of these
//! functions touch the filesystem or a subprocess — they are pure string
//! checks so they're cheap to run on every inbound id/url/filename.

use llmhost_catalog::Catalog;
use regex::Regex;
use std::sync::OnceLock;

fn model_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("valid regex"))
}

/// Broader charset than the id rule one Python variant used — adopted because
/// catalog ids observed in payloads include uppercase letters and dots.
pub fn validate_model_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 100 && model_id_re().is_match(id)
}

pub fn validate_url(url: &str, catalog: &Catalog) -> bool {
    let Some(rest) = url.strip_prefix("https://") else {
        return false;
    };
    let host = rest.split(['/', '?', '#']).next().unwrap_or("").to_lowercase();
    if host.is_empty() {
        return false;
    }
    catalog.is_allowed_domain(&host)
}

/// Rejects URLs containing shell metacharacters that would be dangerous if a
/// command were ever built by naive string concatenation. We build commands
/// as argv vectors (no shell), but the check is kept as defense in depth and
/// because the spec requires it as a standalone validation step.
pub fn url_has_forbidden_chars(url: &str) -> bool {
    url.contains(';') || url.contains('&') || url.contains('|') || url.contains('`')
}

pub fn validate_filename(filename: &str) -> bool {
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        return false;
    }
    filename.ends_with(".gguf") && filename.len() < 100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_broad_id_charset() {
        assert!(validate_model_id("Llama-3.1_8B"));
        assert!(validate_model_id("a"));
    }

    #[test]
    fn rejects_empty_or_long_id() {
        assert!(!validate_model_id(""));
        assert!(!validate_model_id(&"a".repeat(101)));
    }

    #[test]
    fn rejects_id_with_invalid_chars() {
        assert!(!validate_model_id("foo/bar"));
        assert!(!validate_model_id("foo bar"));
        assert!(!validate_model_id("foo;rm -rf"));
    }

    fn catalog_allowing(domains: &[&str]) -> Catalog {
        let doc = format!(
            r#"{{
                "download_path": "models", "temp_path": "models/.tmp", "log_path": "logs",
                "allowed_domains": [{}],
                "models": []
            }}"#,
            domains.iter().map(|d| format!("{d:?}")).collect::<Vec<_>>().join(",")
        );
        let mut f = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut f, doc.as_bytes()).unwrap();
        Catalog::load(f.path()).unwrap()
    }

    #[test]
    fn url_must_be_https_and_allowed_host() {
        let catalog = catalog_allowing(&["huggingface.co"]);
        assert!(validate_url("https://huggingface.co/foo", &catalog));
        assert!(validate_url("https://cdn.huggingface.co/foo", &catalog));
        assert!(!validate_url("http://huggingface.co/foo", &catalog));
        assert!(!validate_url("https://evil.com/foo", &catalog));
    }

    #[test]
    fn url_forbidden_chars() {
        assert!(url_has_forbidden_chars("https://x/y;rm"));
        assert!(url_has_forbidden_chars("https://x/y&z"));
        assert!(url_has_forbidden_chars("https://x/y|z"));
        assert!(url_has_forbidden_chars("https://x/y`z`"));
        assert!(!url_has_forbidden_chars("https://x/y?z=1"));
    }

    #[test]
    fn filename_path_traversal_rejected() {
        assert!(!validate_filename("../etc/passwd"));
        assert!(!validate_filename("a/b.gguf"));
        assert!(!validate_filename("a\\b.gguf"));
        assert!(!validate_filename("model.bin"));
        assert!(validate_filename("model.gguf"));
    }

    #[test]
    fn filename_length_limit() {
        let long = format!("{}.gguf", "a".repeat(100));
        assert!(!validate_filename(&long));
    }
}
