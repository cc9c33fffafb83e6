//! # Error Handling
//!
//! Error types shared across the pipeline. Per-item failures are logged and
//! counted by the caller; only [`PipelineError`] aborts a whole run.

use std::path::PathBuf;

use thiserror::Error;

use crate::connectors::github::GitHubError;
use crate::trending::FetchError;

/// Errors raised by [`crate::store::DataStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to move temporary file over {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn serialization(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        StoreError::Serialization {
            path: path.into(),
            source,
        }
    }
}

/// Failure to enrich and persist a single candidate.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("invalid repository name '{0}'")]
    InvalidName(String),

    #[error("metadata lookup for {full_name} failed: {source}")]
    Metadata {
        full_name: String,
        #[source]
        source: GitHubError,
    },

    #[error("saving {id} failed: {source}")]
    Store {
        id: String,
        #[source]
        source: StoreError,
    },
}

/// Run-level failures that make every subsequent step pointless.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fetching trending listing failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("loading taxonomy failed: {0}")]
    Taxonomy(#[source] StoreError),
}
