use lyra_core::CoreError;
use thiserror::Error;

/// Error type for the lyra-notify crate.
///
/// Messages never carry key material, hashes or raw payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("malformed notification: {0}")]
    NotificationParseError(String),

    #[error("transaction not found: {0}")]
    TransactionNotFound(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type alias for lyra-notify operations.
pub type NotifyResult<T> = Result<T, NotifyError>;

impl NotifyError {
    /// Whether this rejection belongs in the security log.
    pub fn is_security_rejection(&self) -> bool {
        matches!(self, NotifyError::InvalidSignature)
    }
}
