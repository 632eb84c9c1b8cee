use std::result::Result as StdResult;

use thiserror::Error;

/// Error type that captures split ledger failures.
///
/// `Validation`, `SplitMismatch`, `NotFound` and `UnknownCurrency` abort the
/// triggering operation before anything is committed. `NoOp` is benign and
/// leaves state unchanged. `Storage` belongs to the persistence domain and is
/// reported separately from logic errors.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("split amounts must sum to the total: expected {expected:.2}, got {actual:.2}")]
    SplitMismatch { expected: f64, actual: f64 },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),
    #[error("Nothing to do: {0}")]
    NoOp(String),
    #[error("Persistence error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = StdResult<T, SplitError>;

impl SplitError {
    pub fn is_noop(&self) -> bool {
        matches!(self, SplitError::NoOp(_))
    }

    /// True for failures of the storage collaborator rather than of the input.
    pub fn is_persistence(&self) -> bool {
        matches!(self, SplitError::Storage(_))
    }
}

impl From<std::io::Error> for SplitError {
    fn from(err: std::io::Error) -> Self {
        SplitError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for SplitError {
    fn from(err: serde_json::Error) -> Self {
        SplitError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_message_is_specific() {
        let err = SplitError::SplitMismatch {
            expected: 100.0,
            actual: 90.0,
        };
        let message = err.to_string();
        assert!(message.contains("split amounts must sum to the total"));
        assert!(message.contains("100.00"));
        assert!(message.contains("90.00"));
    }

    #[test]
    fn io_errors_map_to_persistence_domain() {
        let err: SplitError = std::io::Error::new(std::io::ErrorKind::Other, "disk gone").into();
        assert!(err.is_persistence());
        assert!(!err.is_noop());
    }
}
