//! Dedup history
//!
//! - Key derivation (day bucket / content hash)
//! - Persisted key → timestamp store with retention pruning

pub mod key;
pub mod store;

pub use key::DedupKey;
pub use store::DedupStore;
