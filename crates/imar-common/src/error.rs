//! Error types shared across the Imar workspace

use thiserror::Error;

/// Result type alias for operations against the upstream stores
pub type Result<T> = std::result::Result<T, StoreError>;

/// Failure talking to the remote persistence API.
///
/// `Unavailable` covers transport-level failures (connect, timeout, 5xx) and
/// is retryable by the caller; nothing in this workspace retries internally.
/// `Rejected` covers well-formed requests the upstream refused.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("upstream store unavailable: {0}")]
    Unavailable(String),

    #[error("upstream store rejected the request: {0}")]
    Rejected(String),
}

impl StoreError {
    /// Whether the caller may reasonably retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(StoreError::Unavailable("timeout".into()).is_retryable());
        assert!(!StoreError::Rejected("bad payload".into()).is_retryable());
    }
}
