use lyra_core::{fields, FieldSet, IS_REST_FIELD};
use serde::{Deserialize, Serialize};
use std::fmt;

/// REST envelope keys, as posted by the gateway.
pub const REST_ANSWER_FIELD: &str = "kr-answer";
pub const REST_ANSWER_TYPE_FIELD: &str = "kr-answer-type";
pub const REST_HASH_FIELD: &str = "kr-hash";
pub const REST_HASH_ALGORITHM_FIELD: &str = "kr-hash-algorithm";
pub const REST_HASH_KEY_FIELD: &str = "kr-hash-key";

/// The only hash algorithm REST envelopes are signed with.
pub const REST_HASH_ALGORITHM: &str = "sha256_hmac";

// ---------------------------------------------------------------------------
// InboundNotification: one payload, resolved once into its wire style
// ---------------------------------------------------------------------------

/// Signed REST material kept next to the normalized fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestEnvelope {
    /// The `kr-answer` JSON string exactly as received. The hash covers it.
    pub answer: String,
    pub hash: String,
    pub hash_algorithm: Option<String>,
    /// `password` or `sha256_hmac`, as announced by the gateway.
    pub hash_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundNotification {
    /// Redirect-form style: flat `vads_*` fields plus `signature`.
    Legacy { fields: FieldSet },
    /// REST style: the answer converted to `vads_*` fields, `is_rest = 1`.
    Rest {
        fields: FieldSet,
        envelope: RestEnvelope,
    },
}

impl InboundNotification {
    pub fn fields(&self) -> &FieldSet {
        match self {
            InboundNotification::Legacy { fields } => fields,
            InboundNotification::Rest { fields, .. } => fields,
        }
    }

    pub fn into_fields(self) -> FieldSet {
        match self {
            InboundNotification::Legacy { fields } => fields,
            InboundNotification::Rest { fields, .. } => fields,
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self, InboundNotification::Rest { .. })
    }

    /// Gateway order id (`vads_order_id`), empty when absent.
    pub fn order_id(&self) -> &str {
        self.fields().get_or_empty(fields::ORDER_ID)
    }

    pub fn trans_status(&self) -> &str {
        self.fields().get_or_empty(fields::TRANS_STATUS)
    }

    /// Whether the field set carries the `is_rest = 1` marker.
    pub fn has_rest_marker(&self) -> bool {
        self.fields().get(IS_REST_FIELD) == Some("1")
    }
}

// ---------------------------------------------------------------------------
// NotificationChannel: which endpoint the payload arrived on
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    /// Browser redirect back to the shop.
    Return,
    /// Server-to-server instant payment notification.
    Ipn,
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationChannel::Return => write!(f, "return"),
            NotificationChannel::Ipn => write!(f, "ipn"),
        }
    }
}

// ---------------------------------------------------------------------------
// VerificationResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    InvalidSignature,
    MissingSignature,
    UnsupportedHashAlgorithm,
    /// No key is configured for the current mode and channel.
    MissingKey,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::InvalidSignature => "invalid signature",
            RejectReason::MissingSignature => "missing signature",
            RejectReason::UnsupportedHashAlgorithm => "unsupported hash algorithm",
            RejectReason::MissingKey => "no verification key configured",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub ok: bool,
    pub reason: Option<RejectReason>,
}

impl VerificationResult {
    pub fn accepted() -> Self {
        Self {
            ok: true,
            reason: None,
        }
    }

    pub fn rejected(reason: RejectReason) -> Self {
        Self {
            ok: false,
            reason: Some(reason),
        }
    }
}

// ---------------------------------------------------------------------------
// PaymentOutcome
// ---------------------------------------------------------------------------

/// What a notification says about the payment. Computed, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Paid,
    Abandoned,
    Cancelled,
    Failed,
    Pending,
}

impl fmt::Display for PaymentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentOutcome::Paid => "paid",
            PaymentOutcome::Abandoned => "abandoned",
            PaymentOutcome::Cancelled => "cancelled",
            PaymentOutcome::Failed => "failed",
            PaymentOutcome::Pending => "pending",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Acknowledgment: plain-text IPN reply
// ---------------------------------------------------------------------------

/// Reply body for the gateway. Every variant is sent with a 2xx status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Acknowledgment {
    Processed,
    Abandoned,
    /// REST notification for an order cycle that is still open.
    Failure,
    BadRequest,
    Error,
}

impl Acknowledgment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Acknowledgment::Processed => "Payment processed, order has been updated.",
            Acknowledgment::Abandoned => "Payment abandoned.",
            Acknowledgment::Failure => "Payment failure.",
            Acknowledgment::BadRequest => "Bad request received.",
            Acknowledgment::Error => "An error occurred while processing payment.",
        }
    }
}

impl fmt::Display for Acknowledgment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
