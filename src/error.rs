use std::path::PathBuf;

use thiserror::Error;

/// Failure fetching a single document. Always recovered by the caller:
/// the item is skipped and stays eligible for the next run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("failed to read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// True when the archive never answered (connect/timeout), as opposed to
    /// answering with an error status.
    pub fn is_transport(&self) -> bool {
        matches!(self, FetchError::Request { .. })
    }
}

/// Errors that abort the whole run.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("cannot open record store at {path:?}: {source}")]
    OpenStore {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("archive at {root} is unreachable: {source}")]
    ArchiveUnreachable {
        root: String,
        #[source]
        source: FetchError,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl From<config::ConfigError> for SetupError {
    fn from(e: config::ConfigError) -> Self {
        SetupError::Config(e.to_string())
    }
}
