use thiserror::Error;

use crate::models::{Ledger, UserMap};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("user already exists: {0}")]
    UserExists(String),
    #[error("user not registered: {0}")]
    UnknownUser(String),
    #[error("incorrect password")]
    BadCredential,
    #[error("{0}")]
    Other(String),
}

/// One-way credential boundary. `hash` produces an opaque string from
/// which the plaintext cannot be recovered; `verify` checks a candidate
/// against a previously produced hash.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> String;
    fn verify(&self, plaintext: &str, stored: &str) -> bool;
}

/// Durable, whole-document persistence of all user records.
///
/// Implementations must serialize every load-mutate-save cycle so that
/// two writers within one process cannot interleave between `load` and
/// `save`. Cross-process writers remain uncoordinated.
pub trait UserRepository: Send + Sync {
    /// Read the backing document. An absent, empty, or unparseable
    /// document yields an empty map rather than an error.
    fn load(&self) -> Result<UserMap, StorageError>;

    /// Serialize the complete mapping and overwrite the backing document.
    fn save(&self, users: &UserMap) -> Result<(), StorageError>;

    /// Create a user with an empty ledger. The plaintext password is
    /// passed through the hashing collaborator and never persisted.
    fn register(&self, username: &str, password: &str) -> Result<Ledger, StorageError>;

    /// Check a candidate password and return the stored ledger snapshot.
    fn authenticate(&self, username: &str, password: &str) -> Result<Ledger, StorageError>;

    /// Replace one user's ledger snapshot and persist the whole document.
    fn update_ledger(&self, username: &str, ledger: &Ledger) -> Result<(), StorageError>;
}
