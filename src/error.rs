//! Error types for the magma-search crate.
//!
//! [`SearchError`] is fatal and only produced before any network activity
//! (bad configuration, unusable proxy, HTTP client construction). Everything
//! that can go wrong once the run is under way is recorded as an
//! [`ErrorKind`] on the affected page instead of aborting the batch.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fatal errors surfaced to the caller before a run starts.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Invalid query or search configuration.
    #[error("config error: {0}")]
    Config(String),

    /// The shared HTTP client could not be constructed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for SearchError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Convenience type alias for magma-search results.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Non-fatal failure classification attached to individual pages and
/// provider pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The request exceeded its timeout on every attempt.
    Timeout,
    /// Connection failure, reset, or retryable status that never recovered.
    NetworkFailure,
    /// Permanent rejection: a 4xx other than 429, or an unbuildable request.
    ClientRejected,
    /// The body was empty or otherwise unusable as a results page.
    ParseFailure,
    /// Pagination termination signal; not a failure.
    ProviderExhausted,
}

impl ErrorKind {
    /// Returns a stable, human-readable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::NetworkFailure => "network failure",
            Self::ClientRejected => "client rejected",
            Self::ParseFailure => "parse failure",
            Self::ProviderExhausted => "provider exhausted",
        }
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::NetworkFailure)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
