//! Transaction stores for the Lyra gateway integration.
//!
//! Both backends implement [`lyra_core::TransactionStore`] with a version
//! column checked on every update, which is what keeps concurrent deliveries
//! of one notification from applying twice.

pub mod in_memory_backend;

#[cfg(feature = "sqlite")]
pub mod storage;

pub use in_memory_backend::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use storage::SqliteStore;
