//! Core types and traits for the fintrack ledger.
//!
//! This crate provides the domain model (entries, ledgers, user records)
//! and the `UserRepository` trait, enabling pluggable persistence
//! implementations in separate crates.

pub mod models;
pub mod storage;

// Re-export key types at crate root for convenience
pub use models::{Entry, Ledger, LedgerDetail, LedgerError, UserMap, UserRecord};
pub use storage::{CredentialHasher, StorageError, UserRepository};
