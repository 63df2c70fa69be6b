use thiserror::Error;

/// Error type for the lyra binary, aggregating errors from the library
/// crates.
#[derive(Debug, Error)]
pub enum RootError {
    #[error("core error: {0}")]
    Core(#[from] lyra_core::CoreError),

    #[error("checkout error: {0}")]
    Checkout(#[from] lyra_checkout::CheckoutError),

    /// The order was already paid; a new payment session is refused.
    #[error("order already paid: {0}")]
    AlreadyPaid(String),

    /// Two host orders sanitize to the same gateway order id.
    #[error("gateway order id {reference} already belongs to order {owner}")]
    ReferenceCollision { reference: String, owner: String },

    #[error("internal error: {0}")]
    Internal(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RootError {
    fn from(e: serde_json::Error) -> Self {
        RootError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for RootError {
    fn from(e: toml::de::Error) -> Self {
        RootError::Config(format!("TOML parse error: {}", e))
    }
}

pub type RootResult<T> = Result<T, RootError>;
