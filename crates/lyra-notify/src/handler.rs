//! Runs the notification pipeline for both inbound channels and turns every
//! result into something safe to hand back to the gateway or the browser.

use std::sync::Arc;

use lyra_core::{FieldSet, ProviderConfig, TransactionStore};

use crate::error::{NotifyError, NotifyResult};
use crate::normalizer::classify_and_normalize;
use crate::resolver::{Resolution, TransactionResolver};
use crate::types::{Acknowledgment, NotificationChannel};
use crate::verifier::{is_abandoned_cycle, order_cycle_closed, verify};

/// Log target for signature rejections, kept apart from benign no-ops.
pub const SECURITY_TARGET: &str = "lyra::security";

/// Result of a notification that passed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Processed {
    /// REST IPN for an order cycle that is still open. Nothing applied.
    OpenCycle,
    /// Abandoned payment or cancelled unpaid cycle. Nothing applied.
    Abandoned,
    Resolved(Resolution),
}

pub struct NotificationService {
    config: Arc<ProviderConfig>,
    store: Arc<dyn TransactionStore>,
}

impl NotificationService {
    pub fn new(config: Arc<ProviderConfig>, store: Arc<dyn TransactionStore>) -> Self {
        Self { config, store }
    }

    /// Normalize, verify, short-circuit no-ops, then resolve.
    pub fn process(&self, raw: &FieldSet, channel: NotificationChannel) -> NotifyResult<Processed> {
        let notification = classify_and_normalize(raw)?;
        tracing::debug!(
            channel = %channel,
            rest = notification.is_rest(),
            order_id = notification.order_id(),
            "notification received"
        );

        let result = verify(
            &notification,
            channel,
            self.config.credentials(),
            self.config.sign_algorithm,
        );
        if !result.ok {
            tracing::warn!(
                target: SECURITY_TARGET,
                channel = %channel,
                order_id = notification.order_id(),
                rest = notification.is_rest(),
                reason = %result.reason.map(|r| r.to_string()).unwrap_or_default(),
                "notification rejected"
            );
            return Err(NotifyError::InvalidSignature);
        }

        if channel == NotificationChannel::Ipn && !order_cycle_closed(&notification) {
            tracing::info!(
                order_id = notification.order_id(),
                "order cycle still open, nothing to apply"
            );
            return Ok(Processed::OpenCycle);
        }

        if is_abandoned_cycle(notification.fields()) {
            tracing::info!(
                order_id = notification.order_id(),
                status = notification.trans_status(),
                "payment abandoned, nothing to apply"
            );
            return Ok(Processed::Abandoned);
        }

        let is_rest = notification.is_rest();
        let resolution =
            TransactionResolver::new(self.store.as_ref()).resolve(notification.fields(), is_rest)?;
        Ok(Processed::Resolved(resolution))
    }

    /// Server-to-server notification. Always yields an acknowledgment.
    pub fn handle_ipn(&self, raw: &FieldSet) -> Acknowledgment {
        match self.process(raw, NotificationChannel::Ipn) {
            Ok(Processed::Resolved(_)) => Acknowledgment::Processed,
            Ok(Processed::Abandoned) => Acknowledgment::Abandoned,
            Ok(Processed::OpenCycle) => Acknowledgment::Failure,
            Err(err) => {
                log_failure(NotificationChannel::Ipn, &err);
                match err {
                    NotifyError::InvalidSignature | NotifyError::NotificationParseError(_) => {
                        Acknowledgment::BadRequest
                    }
                    NotifyError::TransactionNotFound(_) | NotifyError::Core(_) => {
                        Acknowledgment::Error
                    }
                }
            }
        }
    }

    /// Browser return. Failures are logged and swallowed; the caller
    /// redirects to the status page either way.
    pub fn handle_return(&self, raw: &FieldSet) -> Option<Processed> {
        match self.process(raw, NotificationChannel::Return) {
            Ok(processed) => Some(processed),
            Err(err) => {
                log_failure(NotificationChannel::Return, &err);
                None
            }
        }
    }
}

fn log_failure(channel: NotificationChannel, err: &NotifyError) {
    match err {
        // Already reported on the security target.
        NotifyError::InvalidSignature => {}
        NotifyError::NotificationParseError(_) | NotifyError::TransactionNotFound(_) => {
            tracing::warn!(channel = %channel, error = %err, "notification not applied");
        }
        NotifyError::Core(_) => {
            tracing::error!(channel = %channel, error = %err, "notification processing failed");
        }
    }
}
