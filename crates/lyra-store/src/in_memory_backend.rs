use lyra_core::{CoreError, CoreResult, Transaction, TransactionStore};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// In-memory transaction store.
///
/// Used by tests and by `lyra serve` when no database is configured.
pub struct InMemoryStore {
    data: Mutex<HashMap<String, Transaction>>,
}

fn lock_data(
    mutex: &Mutex<HashMap<String, Transaction>>,
) -> CoreResult<MutexGuard<'_, HashMap<String, Transaction>>> {
    mutex
        .lock()
        .map_err(|e| CoreError::Storage(format!("lock poisoned: {}", e)))
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
        }
    }

    /// Get the number of stored transactions.
    pub fn count(&self) -> usize {
        lock_data(&self.data).map(|d| d.len()).unwrap_or(0)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionStore for InMemoryStore {
    fn find(&self, reference: &str) -> CoreResult<Option<Transaction>> {
        let data = lock_data(&self.data)?;
        Ok(data.get(reference).cloned())
    }

    fn create(&self, transaction: &Transaction) -> CoreResult<()> {
        let mut data = lock_data(&self.data)?;
        if data.contains_key(&transaction.reference) {
            return Err(CoreError::DuplicateReference(transaction.reference.clone()));
        }
        data.insert(transaction.reference.clone(), transaction.clone());
        Ok(())
    }

    fn compare_and_swap(
        &self,
        reference: &str,
        expected_version: u64,
        updated: &Transaction,
    ) -> CoreResult<bool> {
        let mut data = lock_data(&self.data)?;
        match data.get_mut(reference) {
            Some(current) if current.version == expected_version => {
                let mut next = updated.clone();
                next.reference = reference.to_string();
                next.version = expected_version + 1;
                *current = next;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyra_core::TransactionState;

    fn draft() -> Transaction {
        Transaction::draft("S001", "S/001", "lyra", 1999, "978")
    }

    #[test]
    fn test_create_and_find() {
        let store = InMemoryStore::new();
        assert!(store.find("S001").unwrap().is_none());
        store.create(&draft()).unwrap();
        let found = store.find("S001").unwrap().unwrap();
        assert_eq!(found.amount_minor, 1999);
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_create_rejects_duplicate() {
        let store = InMemoryStore::new();
        store.create(&draft()).unwrap();
        let err = store.create(&draft()).unwrap_err();
        assert_eq!(err, CoreError::DuplicateReference("S001".into()));
    }

    #[test]
    fn test_cas_bumps_version() {
        let store = InMemoryStore::new();
        store.create(&draft()).unwrap();

        let mut updated = draft();
        updated.state = TransactionState::Done;
        assert!(store.compare_and_swap("S001", 0, &updated).unwrap());

        let found = store.find("S001").unwrap().unwrap();
        assert_eq!(found.version, 1);
        assert_eq!(found.state, TransactionState::Done);
    }

    #[test]
    fn test_cas_rejects_stale_version() {
        let store = InMemoryStore::new();
        store.create(&draft()).unwrap();

        let mut updated = draft();
        updated.state = TransactionState::Pending;
        assert!(store.compare_and_swap("S001", 0, &updated).unwrap());

        updated.state = TransactionState::Error;
        assert!(!store.compare_and_swap("S001", 0, &updated).unwrap());
        assert_eq!(
            store.find("S001").unwrap().unwrap().state,
            TransactionState::Pending
        );
    }

    #[test]
    fn test_cas_on_missing_record() {
        let store = InMemoryStore::new();
        assert!(!store.compare_and_swap("nope", 0, &draft()).unwrap());
    }
}
