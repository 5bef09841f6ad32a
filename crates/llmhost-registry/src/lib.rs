// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The active-model registry: the single coordination point between the chat
//! engine and the download pipeline. One small persistent record says which
//! model is currently active.

use std::io;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("creating registry directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("reading registry file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("parsing registry file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("writing registry file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveModelRecord {
    pub model_name: String,
    pub last_updated: String,
    pub status: String,
}

/// Result of [`Registry::set_current`]: whether a write actually occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Changed,
    Unchanged,
}

/// Owns the path to the active-model record. `read_current` never fails on a
/// missing file — an absent registry simply means no model has been selected
/// yet. Writes go through a temp-file-then-rename to avoid torn reads by
/// concurrent readers.
#[derive(Debug, Clone)]
pub struct Registry {
    path: PathBuf,
}

impl Registry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Current model name, or the empty string if the registry file is
    /// absent. Fails only if the file exists but cannot be read or parsed.
    pub fn read_current(&self) -> Result<String, RegistryError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => {
                let record: ActiveModelRecord =
                    serde_json::from_str(&text).map_err(|source| RegistryError::Parse {
                        path: self.path.display().to_string(),
                        source,
                    })?;
                Ok(record.model_name)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(source) => Err(RegistryError::Read {
                path: self.path.display().to_string(),
                source,
            }),
        }
    }

    /// Replace the record with `{model_name, last_updated: now, status: "active"}`
    /// only if `name` differs from the current selection. Write-suppression
    /// prevents timestamp churn when a client re-asserts the current model.
    pub fn set_current(&self, name: &str) -> Result<SetOutcome, RegistryError> {
        let current = self.read_current()?;
        if current == name {
            return Ok(SetOutcome::Unchanged);
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| RegistryError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let record = ActiveModelRecord {
            model_name: name.to_string(),
            last_updated: Utc::now().to_rfc3339(),
            status: "active".to_string(),
        };
        let body = serde_json::to_string_pretty(&record).expect("ActiveModelRecord is serializable");

        self.write_atomic(&body)?;
        tracing::info!(model_name = %name, "active model registry updated");
        Ok(SetOutcome::Changed)
    }

    fn write_atomic(&self, body: &str) -> Result<(), RegistryError> {
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, body).map_err(|source| RegistryError::Write {
            path: tmp_path.display().to_string(),
            source,
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|source| RegistryError::Write {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(dir.path().join("current_model.json"));
        assert_eq!(registry.read_current().unwrap(), "");
    }

    #[test]
    fn set_then_read_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(dir.path().join("current_model.json"));
        assert_eq!(registry.set_current("modelA.gguf").unwrap(), SetOutcome::Changed);
        assert_eq!(registry.read_current().unwrap(), "modelA.gguf");
    }

    #[test]
    fn write_suppression_on_repeat_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("current_model.json");
        let registry = Registry::new(&path);

        assert_eq!(registry.set_current("modelA.gguf").unwrap(), SetOutcome::Changed);
        let mtime_1 = std::fs::metadata(&path).unwrap().modified().unwrap();

        std::thread::sleep(std::time::Duration::from_millis(10));

        assert_eq!(registry.set_current("modelA.gguf").unwrap(), SetOutcome::Unchanged);
        let mtime_2 = std::fs::metadata(&path).unwrap().modified().unwrap();

        assert_eq!(mtime_1, mtime_2, "second set_current must not touch the file");
    }

    #[test]
    fn set_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("current_model.json");
        let registry = Registry::new(&path);
        registry.set_current("modelA.gguf").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn different_name_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(dir.path().join("current_model.json"));
        registry.set_current("modelA.gguf").unwrap();
        assert_eq!(registry.set_current("modelB.gguf").unwrap(), SetOutcome::Changed);
        assert_eq!(registry.read_current().unwrap(), "modelB.gguf");
    }
}
