use lyra_core::{CoreError, CoreResult, Transaction, TransactionStore};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::sync::{Mutex, MutexGuard};

/// SQLite transaction store.
///
/// One row per gateway order id. The record body is JSON; the `version`
/// column is the compare-and-swap token, checked in the `UPDATE` itself so
/// the check and the write are a single statement.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: &str) -> CoreResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| CoreError::Storage(format!("failed to open database: {}", e)))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS transactions (
                reference TEXT PRIMARY KEY NOT NULL,
                version INTEGER NOT NULL,
                body TEXT NOT NULL,
                created_at TEXT DEFAULT (datetime('now')),
                updated_at TEXT DEFAULT (datetime('now'))
            );",
        )
        .map_err(|e| CoreError::Storage(format!("failed to create tables: {}", e)))?;

        tracing::debug!(path, "transaction store opened");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> CoreResult<Self> {
        Self::open(":memory:")
    }

    fn lock(&self) -> CoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| CoreError::Storage(format!("lock poisoned: {}", e)))
    }
}

impl TransactionStore for SqliteStore {
    fn find(&self, reference: &str) -> CoreResult<Option<Transaction>> {
        let conn = self.lock()?;

        let row: Option<(i64, String)> = conn
            .query_row(
                "SELECT version, body FROM transactions WHERE reference = ?1",
                params![reference],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| CoreError::Storage(format!("query failed: {}", e)))?;

        match row {
            Some((version, body)) => {
                let mut tx: Transaction = serde_json::from_str(&body)?;
                tx.version = version as u64;
                Ok(Some(tx))
            }
            None => Ok(None),
        }
    }

    fn create(&self, transaction: &Transaction) -> CoreResult<()> {
        let conn = self.lock()?;
        let body = serde_json::to_string(transaction)?;

        conn.execute(
            "INSERT INTO transactions (reference, version, body) VALUES (?1, ?2, ?3)",
            params![transaction.reference, transaction.version as i64, body],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref f, _) if f.code == ErrorCode::ConstraintViolation => {
                CoreError::DuplicateReference(transaction.reference.clone())
            }
            other => CoreError::Storage(format!("insert failed: {}", other)),
        })?;

        Ok(())
    }

    fn compare_and_swap(
        &self,
        reference: &str,
        expected_version: u64,
        updated: &Transaction,
    ) -> CoreResult<bool> {
        let conn = self.lock()?;

        let mut next = updated.clone();
        next.reference = reference.to_string();
        next.version = expected_version + 1;
        let body = serde_json::to_string(&next)?;

        let rows = conn
            .execute(
                "UPDATE transactions SET body = ?1, version = ?2, updated_at = datetime('now')
                 WHERE reference = ?3 AND version = ?4",
                params![body, next.version as i64, reference, expected_version as i64],
            )
            .map_err(|e| CoreError::Storage(format!("CAS update failed: {}", e)))?;

        Ok(rows == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyra_core::TransactionState;

    fn draft() -> Transaction {
        Transaction::draft("S001", "S/001", "lyra", 2500, "604")
    }

    #[test]
    fn test_create_and_find() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.find("S001").unwrap().is_none());

        store.create(&draft()).unwrap();
        let found = store.find("S001").unwrap().unwrap();
        assert_eq!(found.reference, "S001");
        assert_eq!(found.host_reference, "S/001");
        assert_eq!(found.amount_minor, 2500);
        assert_eq!(found.state, TransactionState::Draft);
        assert_eq!(found.version, 0);
    }

    #[test]
    fn test_duplicate_reference() {
        let store = SqliteStore::in_memory().unwrap();
        store.create(&draft()).unwrap();
        assert!(matches!(
            store.create(&draft()),
            Err(CoreError::DuplicateReference(_))
        ));
    }

    #[test]
    fn test_cas_success_and_conflict() {
        let store = SqliteStore::in_memory().unwrap();
        store.create(&draft()).unwrap();

        let mut done = draft();
        done.state = TransactionState::Done;
        done.gateway_trans_id = Some("000042".into());
        assert!(store.compare_and_swap("S001", 0, &done).unwrap());

        let mut error = draft();
        error.state = TransactionState::Error;
        assert!(!store.compare_and_swap("S001", 0, &error).unwrap());

        let found = store.find("S001").unwrap().unwrap();
        assert_eq!(found.state, TransactionState::Done);
        assert_eq!(found.version, 1);
        assert_eq!(found.gateway_trans_id.as_deref(), Some("000042"));
    }

    #[test]
    fn test_cas_missing_row() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(!store.compare_and_swap("nope", 0, &draft()).unwrap());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = std::env::temp_dir().join(format!("lyra-store-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tx.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteStore::open(path).unwrap();
            store.create(&draft()).unwrap();
        }
        let store = SqliteStore::open(path).unwrap();
        assert!(store.find("S001").unwrap().is_some());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
