//! Error types for the fetch, persist and notify stages.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the CTFtime API. Fatal for the run: with no current
/// rank there is nothing to compare or persist.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("CTFtime request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("CTFtime returned HTTP {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("team {0} not found on CTFtime")]
    TeamNotFound(u64),

    #[error("team profile for {0} did not contain a country")]
    MissingCountry(u64),
}

/// Errors from the snapshot file. A corrupt file aborts the run rather
/// than being treated as empty, so a real change is never masked by a
/// false first observation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access snapshot file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode snapshots: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors delivering the webhook notification. Best-effort: logged by
/// the caller, never fatal for the run.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("webhook returned HTTP {0}")]
    Status(reqwest::StatusCode),
}
