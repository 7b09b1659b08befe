//! Error types shared by every pipeline stage.
//!
//! Recoverable failures (one record, one file, one status update) are logged
//! and collected into run reports by the callers. Only [`PipelineError`]
//! aborts a run.

use std::path::PathBuf;

use thiserror::Error;

/// Missing or invalid settings. Always fatal, raised before any work starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is missing")]
    Missing(String),

    #[error("invalid setting {key}: {message}")]
    Invalid { key: String, message: String },

    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),
}

impl ConfigError {
    pub fn missing(key: impl Into<String>) -> Self {
        Self::Missing(key.into())
    }

    pub fn invalid(key: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.to_string(),
        }
    }
}

/// Failure talking to the Notion API.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Notion API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unexpected response shape: {0}")]
    Malformed(String),
}

/// Failure posting one snippet to the ingestion endpoint.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} {reason}\n{body}")]
    Status {
        status: u16,
        reason: String,
        body: String,
    },
}

/// Failure reading or writing a persisted map or state file.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error on {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors that abort an export or upload run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("record query failed: {0}")]
    Query(#[source] SourceError),

    #[error("persistence failed: {0}")]
    Store(#[from] StoreError),
}
