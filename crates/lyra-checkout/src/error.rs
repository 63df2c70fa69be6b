use lyra_core::{CoreError, Mode};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// The currency has no numeric gateway code or is not allowed. Aborts checkout.
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("order reference has no usable characters")]
    InvalidReference,

    #[error("installment payment requested but no installment plan is configured")]
    InstallmentsNotConfigured,

    #[error("no signing key configured for {0} mode")]
    MissingKey(Mode),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type CheckoutResult<T> = Result<T, CheckoutError>;
