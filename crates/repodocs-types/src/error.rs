//! Error taxonomy for repodocs, grounded on riptide-types' `RiptideError`.

use thiserror::Error;

/// Result type alias using [`RepodocsError`].
pub type Result<T> = std::result::Result<T, RepodocsError>;

/// Unified error type threaded through every crate's public API.
#[derive(Error, Debug)]
pub enum RepodocsError {
    /// Connection could not be established or was reset mid-flight.
    #[error("network error: {0}")]
    Network(String),

    /// A per-request or run-level deadline elapsed.
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// An HTTP response carried a status code the caller did not accept.
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// No headless browser binary could be located.
    #[error("renderer unavailable: {0}")]
    RendererUnavailable(String),

    /// The headless render did not reach quiescence before its deadline.
    #[error("renderer timed out after {0:?}")]
    RendererTimeout(std::time::Duration),

    /// HTML or Markdown content could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// The cache backing store failed.
    #[error("cache error: {0}")]
    Cache(String),

    /// The writer failed to persist a document.
    #[error("write error: {0}")]
    Write(String),

    /// The on-disk sync state failed to deserialize.
    #[error("state file corrupted: {0}")]
    StateCorrupted(String),

    /// The on-disk sync state's schema version does not match.
    #[error("state schema version mismatch: found {found}, expected {expected}")]
    StateVersionMismatch { found: i64, expected: i64 },

    /// No prior sync state file exists.
    #[error("no prior sync state")]
    StateNotFound,

    /// The router could not classify a locator into any known strategy.
    #[error("unknown strategy for locator: {0}")]
    UnknownStrategy(String),

    /// A locator is not one of the accepted shapes (URL, git ref, manifest path).
    #[error("unsupported locator: {0}")]
    UnsupportedLocator(String),

    /// The run was cancelled via its context/cancellation token.
    #[error("cancelled")]
    Cancelled,

    /// A manifest document failed to parse as YAML or JSON.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// I/O failure outside the categories above.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Escape hatch for interop with `anyhow`-returning helpers.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RepodocsError {
    /// Whether a strategy-level retry of the same request is reasonable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RepodocsError::Network(_) | RepodocsError::Timeout(_) | RepodocsError::RendererTimeout(_)
        )
    }

    /// Whether the run should abort immediately rather than degrade and continue.
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(
            self,
            RepodocsError::UnknownStrategy(_)
                | RepodocsError::UnsupportedLocator(_)
                | RepodocsError::Cancelled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds() {
        assert!(RepodocsError::Network("reset".into()).is_retryable());
        assert!(RepodocsError::Timeout(std::time::Duration::from_secs(1)).is_retryable());
        assert!(!RepodocsError::Parse("bad".into()).is_retryable());
    }

    #[test]
    fn fatal_kinds() {
        assert!(RepodocsError::UnknownStrategy("ftp://x".into()).is_fatal_for_run());
        assert!(RepodocsError::Cancelled.is_fatal_for_run());
        assert!(!RepodocsError::Cache("miss".into()).is_fatal_for_run());
    }
}
