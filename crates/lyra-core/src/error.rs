use thiserror::Error;

/// Error type shared by the core crate and the store implementations.
///
/// Messages never carry key material or computed signatures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("duplicate transaction reference: {0}")]
    DuplicateReference(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_display() {
        let err = CoreError::Storage("lock poisoned".into());
        assert_eq!(err.to_string(), "storage error: lock poisoned");
    }

    #[test]
    fn test_duplicate_reference_names_the_reference() {
        let err = CoreError::DuplicateReference("S00042".into());
        assert!(err.to_string().contains("S00042"));
    }

    #[test]
    fn test_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let err: CoreError = json_err.into();
        assert!(matches!(err, CoreError::Serialization(_)));
    }
}
