//! Lyra Core
//!
//! Shared building blocks for the Lyra (Izipay / Micuentaweb) payment gateway
//! integration: the `vads_*` field set, the static currency table, the
//! canonical signer, and the transaction store contract that the host
//! system implements.

pub mod config;
pub mod crypto;
pub mod currency;
pub mod error;
pub mod traits;
pub mod types;

pub use config::*;
pub use crypto::*;
pub use currency::*;
pub use error::*;
pub use traits::*;
pub use types::*;
