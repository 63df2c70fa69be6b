use crate::error::CoreResult;
use crate::types::Transaction;

// ---------------------------------------------------------------------------
// TransactionStore: the host system's transaction records
//
// Lookup-then-update is serialized through compare_and_swap on the record
// version, so two deliveries of the same notification cannot both apply.
// ---------------------------------------------------------------------------

pub trait TransactionStore: Send + Sync {
    /// Find a transaction by gateway order id.
    fn find(&self, reference: &str) -> CoreResult<Option<Transaction>>;

    /// Insert a new transaction. Fails with `DuplicateReference` if one exists.
    fn create(&self, transaction: &Transaction) -> CoreResult<()>;

    /// Replace the record for `reference` if its version is still
    /// `expected_version`. The stored copy gets version `expected_version + 1`.
    /// Returns false when the record changed underneath the caller or is gone.
    fn compare_and_swap(
        &self,
        reference: &str,
        expected_version: u64,
        updated: &Transaction,
    ) -> CoreResult<bool>;
}
