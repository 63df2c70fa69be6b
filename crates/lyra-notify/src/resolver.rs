//! Idempotent application of a verified notification to its transaction.
//!
//! Lookup and update run as one optimistic unit: the transaction is read,
//! the transition checked, and the update written with compare-and-swap on
//! the record version. A lost race re-reads and re-checks, so a second
//! delivery of the same notification sees the already-applied state and
//! becomes a no-op.

use chrono::Utc;
use lyra_core::{fields, CoreError, FieldSet, Transaction, TransactionState, TransactionStore};

use crate::error::{NotifyError, NotifyResult};
use crate::types::PaymentOutcome;
use crate::verifier::classify_outcome;

/// Compare-and-swap attempts before giving up on a contended record.
pub const MAX_CAS_ATTEMPTS: usize = 3;

/// What the resolver did with a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The transaction moved to a new state.
    Applied(Transaction),
    /// Nothing to do: re-delivery, or a transition the current state forbids.
    AlreadyProcessed(Transaction),
}

impl Resolution {
    pub fn transaction(&self) -> &Transaction {
        match self {
            Resolution::Applied(tx) | Resolution::AlreadyProcessed(tx) => tx,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, Resolution::Applied(_))
    }
}

/// Transaction state a payment outcome leads to.
pub fn target_state(outcome: PaymentOutcome) -> TransactionState {
    match outcome {
        PaymentOutcome::Paid => TransactionState::Done,
        PaymentOutcome::Pending => TransactionState::Pending,
        PaymentOutcome::Abandoned | PaymentOutcome::Cancelled => TransactionState::Cancelled,
        PaymentOutcome::Failed => TransactionState::Error,
    }
}

pub struct TransactionResolver<'a> {
    store: &'a dyn TransactionStore,
}

impl<'a> TransactionResolver<'a> {
    pub fn new(store: &'a dyn TransactionStore) -> Self {
        Self { store }
    }

    /// Apply the notification fields to the transaction named by
    /// `vads_order_id`.
    pub fn resolve(&self, fields: &FieldSet, is_rest: bool) -> NotifyResult<Resolution> {
        let reference = fields.get_or_empty(fields::ORDER_ID);
        if reference.is_empty() {
            return Err(NotifyError::NotificationParseError(
                "notification has no vads_order_id".into(),
            ));
        }

        let outcome = classify_outcome(fields);
        let target = target_state(outcome);

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let current = self
                .store
                .find(reference)?
                .ok_or_else(|| NotifyError::TransactionNotFound(reference.to_string()))?;

            if !current.state.can_transition_to(target) {
                tracing::info!(
                    reference,
                    state = %current.state,
                    outcome = %outcome,
                    "notification already processed"
                );
                return Ok(Resolution::AlreadyProcessed(current));
            }

            let updated = apply(&current, fields, target);
            if self
                .store
                .compare_and_swap(reference, current.version, &updated)?
            {
                tracing::info!(
                    reference,
                    from = %current.state,
                    to = %updated.state,
                    rest = is_rest,
                    "transaction updated"
                );
                return Ok(Resolution::Applied(updated));
            }

            tracing::debug!(reference, attempt, "transaction changed concurrently, retrying");
        }

        Err(NotifyError::Core(CoreError::Storage(format!(
            "transaction {reference} still contended after {MAX_CAS_ATTEMPTS} attempts"
        ))))
    }
}

fn apply(current: &Transaction, fields: &FieldSet, target: TransactionState) -> Transaction {
    let non_empty = |key: &str| fields.get(key).filter(|v| !v.is_empty()).map(str::to_string);

    let mut updated = current.clone();
    updated.state = target;
    updated.gateway_trans_id = non_empty(fields::TRANS_ID).or(updated.gateway_trans_id);
    updated.gateway_trans_uuid = non_empty(fields::TRANS_UUID).or(updated.gateway_trans_uuid);
    updated.last_status = non_empty(fields::TRANS_STATUS);
    updated.version = current.version + 1;
    updated.updated_at = Utc::now();
    updated
}
