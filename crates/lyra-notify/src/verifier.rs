//! Signature verification and outcome classification.
//!
//! Legacy: the Canonical Signer over the `vads_*` fields, keyed with the
//! shared legacy key and the configured algorithm, compared with `signature`.
//! REST: hex HMAC-SHA-256 of the raw `kr-answer`, compared with `kr-hash`.
//! The key depends on the channel: the REST SHA-256 key for browser returns,
//! the REST password for IPNs.

use lyra_core::{
    constant_time_eq, fields, hmac_sha256_hex, FieldSet, GatewayCredentials, SignAlgorithm,
    SIGNATURE_FIELD,
};

use crate::types::{
    InboundNotification, NotificationChannel, PaymentOutcome, RejectReason, RestEnvelope,
    VerificationResult, REST_HASH_ALGORITHM,
};

/// Check the signature of a normalized notification.
pub fn verify(
    notification: &InboundNotification,
    channel: NotificationChannel,
    credentials: &GatewayCredentials,
    algorithm: SignAlgorithm,
) -> VerificationResult {
    match notification {
        InboundNotification::Legacy { fields } => verify_legacy(fields, credentials, algorithm),
        InboundNotification::Rest { envelope, .. } => verify_rest(envelope, channel, credentials),
    }
}

fn verify_legacy(
    fields: &FieldSet,
    credentials: &GatewayCredentials,
    algorithm: SignAlgorithm,
) -> VerificationResult {
    let Some(expected) = fields.get(SIGNATURE_FIELD).filter(|s| !s.is_empty()) else {
        return VerificationResult::rejected(RejectReason::MissingSignature);
    };
    if credentials.legacy_key.is_empty() {
        return VerificationResult::rejected(RejectReason::MissingKey);
    }

    match lyra_core::verify(fields, expected, algorithm, credentials.legacy_key.expose()) {
        Ok(true) => VerificationResult::accepted(),
        Ok(false) | Err(_) => VerificationResult::rejected(RejectReason::InvalidSignature),
    }
}

fn verify_rest(
    envelope: &RestEnvelope,
    channel: NotificationChannel,
    credentials: &GatewayCredentials,
) -> VerificationResult {
    if let Some(algorithm) = envelope.hash_algorithm.as_deref() {
        if algorithm != REST_HASH_ALGORITHM {
            return VerificationResult::rejected(RejectReason::UnsupportedHashAlgorithm);
        }
    }
    if envelope.hash.is_empty() {
        return VerificationResult::rejected(RejectReason::MissingSignature);
    }

    let key = match channel {
        NotificationChannel::Return => &credentials.rest_sha256_key,
        NotificationChannel::Ipn => &credentials.rest_password,
    };
    if key.is_empty() {
        return VerificationResult::rejected(RejectReason::MissingKey);
    }

    let Ok(computed) = hmac_sha256_hex(key.expose(), &envelope.answer) else {
        return VerificationResult::rejected(RejectReason::InvalidSignature);
    };
    let expected = envelope.hash.trim().to_ascii_lowercase();
    if constant_time_eq(computed.as_bytes(), expected.as_bytes()) {
        VerificationResult::accepted()
    } else {
        VerificationResult::rejected(RejectReason::InvalidSignature)
    }
}

// ---------------------------------------------------------------------------
// Outcome classification
// ---------------------------------------------------------------------------

/// Map `vads_trans_status` to a payment outcome.
pub fn classify_outcome(fields: &FieldSet) -> PaymentOutcome {
    match fields.get_or_empty(fields::TRANS_STATUS) {
        "AUTHORISED" | "CAPTURED" | "ACCEPTED" => PaymentOutcome::Paid,
        "INITIAL"
        | "WAITING_AUTHORISATION"
        | "WAITING_AUTHORISATION_TO_VALIDATE"
        | "AUTHORISED_TO_VALIDATE"
        | "UNDER_VERIFICATION"
        | "PRE_AUTHORISED"
        | "WAITING_FOR_PAYMENT"
        | "SUSPENDED" => PaymentOutcome::Pending,
        "ABANDONED" => PaymentOutcome::Abandoned,
        "CANCELED" | "CANCELLED" => PaymentOutcome::Cancelled,
        _ => PaymentOutcome::Failed,
    }
}

/// An abandoned payment, or a cancellation that closed an unpaid order.
///
/// `ABANDONED || (CANCELED && UNPAID && CLOSED)`. Such notifications are
/// acknowledged without touching the transaction.
pub fn is_abandoned_cycle(fields: &FieldSet) -> bool {
    let status = fields.get_or_empty(fields::TRANS_STATUS);
    status == "ABANDONED"
        || (status == "CANCELED"
            && fields.get_or_empty(fields::ORDER_STATUS) == "UNPAID"
            && fields.get_or_empty(fields::ORDER_CYCLE) == "CLOSED")
}

/// Whether the order cycle is finished. Legacy notifications carry no cycle
/// and always count as closed.
pub fn order_cycle_closed(notification: &InboundNotification) -> bool {
    match notification {
        InboundNotification::Legacy { .. } => true,
        InboundNotification::Rest { fields, .. } => {
            fields.get_or_empty(fields::ORDER_CYCLE) == "CLOSED"
        }
    }
}
