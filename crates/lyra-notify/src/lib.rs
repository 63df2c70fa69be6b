//! Lyra Notification Channel
//!
//! Inbound side of the gateway integration. Every browser return and every
//! server-to-server IPN goes through the same pipeline:
//!
//! 1. [`classify_and_normalize`] decides between the legacy `vads_*` form and
//!    the REST `kr-answer` envelope, and converts REST answers to `vads_*`.
//! 2. [`verify`] checks the signature with the key the channel requires.
//! 3. [`classify_outcome`] and [`is_abandoned_cycle`] short-circuit no-op
//!    notifications.
//! 4. [`TransactionResolver`] applies the state change at most once.
//!
//! [`NotificationService`] runs the pipeline and always produces an
//! [`Acknowledgment`]: failures are logged, never surfaced to the gateway.

pub mod error;
pub mod handler;
pub mod normalizer;
pub mod resolver;
pub mod types;
pub mod verifier;

pub use error::{NotifyError, NotifyResult};
pub use handler::{NotificationService, Processed, SECURITY_TARGET};
pub use normalizer::classify_and_normalize;
pub use resolver::{target_state, Resolution, TransactionResolver, MAX_CAS_ATTEMPTS};
pub use types::{
    Acknowledgment, InboundNotification, NotificationChannel, PaymentOutcome, RejectReason,
    RestEnvelope, VerificationResult,
};
pub use verifier::{classify_outcome, is_abandoned_cycle, order_cycle_closed, verify};
