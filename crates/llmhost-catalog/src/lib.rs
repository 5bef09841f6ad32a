// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The model catalog: an immutable document describing available models and
//! their mirror methods, loaded once at startup. The file itself is a
//! configuration artifact owned by the deployment, not by this crate — we
//! only define the shape and load it.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("reading catalog file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing catalog file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("catalog entry id {0:?} is duplicated")]
    DuplicateId(String),
}

/// One mirror/transfer approach for a model. An ordered list within a
/// [`ModelDescriptor`] forms the fallback chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferKind {
    Wget,
    Curl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferMethod {
    #[serde(rename = "type")]
    pub kind: TransferKind,
    pub url: String,
}

/// A catalog entry. Read-only at runtime; the catalog as a whole is loaded
/// once and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    pub filename: String,
    #[serde(rename = "size_gb")]
    pub expected_size_gb: f64,
    pub methods: Vec<TransferMethod>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogDocument {
    download_path: String,
    temp_path: String,
    log_path: String,
    allowed_domains: Vec<String>,
    models: Vec<ModelDescriptor>,
}

/// The parsed, validated catalog. `lookup` is the only read path callers need;
/// the backing map keeps `list()`/`status()` queries O(1).
#[derive(Debug, Clone)]
pub struct Catalog {
    pub download_path: String,
    pub temp_path: String,
    pub log_path: String,
    pub allowed_domains: Vec<String>,
    models: HashMap<String, ModelDescriptor>,
    order: Vec<String>,
}

impl Catalog {
    /// Load and validate a catalog document. A missing or unparsable file is
    /// a fatal startup error — the caller should log and exit.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let doc: CatalogDocument =
            serde_json::from_str(&text).map_err(|source| CatalogError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        let mut models = HashMap::with_capacity(doc.models.len());
        let mut order = Vec::with_capacity(doc.models.len());
        for model in doc.models {
            if models.contains_key(&model.id) {
                return Err(CatalogError::DuplicateId(model.id));
            }
            order.push(model.id.clone());
            models.insert(model.id.clone(), model);
        }

        tracing::info!(count = models.len(), path = %path.display(), "loaded model catalog");

        Ok(Self {
            download_path: doc.download_path,
            temp_path: doc.temp_path,
            log_path: doc.log_path,
            allowed_domains: doc.allowed_domains,
            models,
            order,
        })
    }

    pub fn lookup(&self, id: &str) -> Option<&ModelDescriptor> {
        self.models.get(id)
    }

    /// All descriptors, in catalog (file) order.
    pub fn iter(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.order.iter().filter_map(|id| self.models.get(id))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn is_allowed_domain(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.allowed_domains
            .iter()
            .any(|suffix| host.ends_with(suffix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample() -> &'static str {
        r#"{
            "download_path": "models",
            "temp_path": "models/.tmp",
            "log_path": "logs",
            "allowed_domains": ["huggingface.co"],
            "models": [
                {
                    "id": "foo",
                    "name": "Foo 7B",
                    "filename": "foo.gguf",
                    "size_gb": 4.1,
                    "methods": [
                        {"type": "wget", "url": "https://huggingface.co/foo/resolve/main/foo.gguf"}
                    ]
                }
            ]
        }"#
    }

    #[test]
    fn loads_valid_catalog() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{}", sample()).unwrap();
        let catalog = Catalog::load(f.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        let entry = catalog.lookup("foo").unwrap();
        assert_eq!(entry.display_name, "Foo 7B");
        assert_eq!(entry.filename, "foo.gguf");
    }

    #[test]
    fn missing_file_is_error() {
        let result = Catalog::load(Path::new("/tmp/llmhost_catalog_does_not_exist.json"));
        assert!(result.is_err());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let doc = r#"{
            "download_path": "models", "temp_path": "models/.tmp", "log_path": "logs",
            "allowed_domains": [],
            "models": [
                {"id": "foo", "name": "a", "filename": "a.gguf", "size_gb": 1.0, "methods": []},
                {"id": "foo", "name": "b", "filename": "b.gguf", "size_gb": 1.0, "methods": []}
            ]
        }"#;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{}", doc).unwrap();
        assert!(Catalog::load(f.path()).is_err());
    }

    #[test]
    fn domain_suffix_matching() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{}", sample()).unwrap();
        let catalog = Catalog::load(f.path()).unwrap();
        assert!(catalog.is_allowed_domain("huggingface.co"));
        assert!(catalog.is_allowed_domain("cdn.huggingface.co"));
        assert!(!catalog.is_allowed_domain("evil.com"));
    }
}
