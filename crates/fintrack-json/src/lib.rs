//! Whole-document JSON persistence for fintrack user records.
//!
//! The entire user map lives in one JSON file. Every mutation is a
//! load-mutate-save cycle over that file, serialized by an internal lock
//! so writers within one process cannot interleave. A crash mid-write is
//! only mitigated by the lenient load, which treats an unreadable
//! document as empty.

use std::{
    io::ErrorKind,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use fintrack_core::{
    models::{Ledger, UserMap, UserRecord},
    storage::{CredentialHasher, StorageError, UserRepository},
};

pub struct JsonFileRepository {
    path: PathBuf,
    hasher: Arc<dyn CredentialHasher>,
    write_lock: Mutex<()>,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self {
            path: path.into(),
            hasher,
            write_lock: Mutex::new(()),
        }
    }

    /// Caller must hold `write_lock`.
    fn read_document(&self) -> Result<UserMap, StorageError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(UserMap::new()),
            Err(e) => return Err(e.into()),
        };
        if contents.trim().is_empty() {
            return Ok(UserMap::new());
        }
        match serde_json::from_str(&contents) {
            Ok(users) => Ok(users),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "User store unreadable, treating as empty"
                );
                Ok(UserMap::new())
            }
        }
    }

    /// Caller must hold `write_lock`.
    fn write_document(&self, users: &UserMap) -> Result<(), StorageError> {
        let contents = serde_json::to_string_pretty(users)
            .map_err(|e| StorageError::Other(e.to_string()))?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl UserRepository for JsonFileRepository {
    fn load(&self) -> Result<UserMap, StorageError> {
        let _guard = self.write_lock.lock().unwrap();
        self.read_document()
    }

    fn save(&self, users: &UserMap) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap();
        self.write_document(users)
    }

    fn register(&self, username: &str, password: &str) -> Result<Ledger, StorageError> {
        let _guard = self.write_lock.lock().unwrap();
        let mut users = self.read_document()?;
        if users.contains_key(username) {
            return Err(StorageError::UserExists(username.to_string()));
        }
        let record = UserRecord {
            password_hash: self.hasher.hash(password),
            movements: Ledger::new(),
        };
        let ledger = record.movements.clone();
        users.insert(username.to_string(), record);
        self.write_document(&users)?;
        tracing::debug!(user = %username, "Registered new user");
        Ok(ledger)
    }

    fn authenticate(&self, username: &str, password: &str) -> Result<Ledger, StorageError> {
        let _guard = self.write_lock.lock().unwrap();
        let users = self.read_document()?;
        let record = users
            .get(username)
            .ok_or_else(|| StorageError::UnknownUser(username.to_string()))?;
        if !self.hasher.verify(password, &record.password_hash) {
            tracing::warn!(user = %username, "Rejected login with bad credentials");
            return Err(StorageError::BadCredential);
        }
        Ok(record.movements.clone())
    }

    fn update_ledger(&self, username: &str, ledger: &Ledger) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap();
        let mut users = self.read_document()?;
        let record = users
            .get_mut(username)
            .ok_or_else(|| StorageError::UnknownUser(username.to_string()))?;
        record.movements = ledger.clone();
        self.write_document(&users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    /// Reversible stand-in for the real hasher; storage must not care.
    struct MarkerHasher;

    impl CredentialHasher for MarkerHasher {
        fn hash(&self, plaintext: &str) -> String {
            format!("hashed:{plaintext}")
        }

        fn verify(&self, plaintext: &str, stored: &str) -> bool {
            stored == format!("hashed:{plaintext}")
        }
    }

    fn setup() -> (JsonFileRepository, TempDir) {
        let dir = TempDir::new().unwrap();
        let repo = JsonFileRepository::new(dir.path().join("users.json"), Arc::new(MarkerHasher));
        (repo, dir)
    }

    #[test]
    fn missing_document_loads_as_empty() {
        let (repo, _dir) = setup();
        assert!(repo.load().unwrap().is_empty());
    }

    #[test]
    fn blank_document_loads_as_empty() {
        let (repo, dir) = setup();
        std::fs::write(dir.path().join("users.json"), "   \n").unwrap();
        assert!(repo.load().unwrap().is_empty());
    }

    #[test]
    fn malformed_document_loads_as_empty() {
        let (repo, dir) = setup();
        std::fs::write(dir.path().join("users.json"), "{not valid json").unwrap();
        assert!(repo.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let (repo, _dir) = setup();
        repo.register("ana", "pw1").unwrap();
        repo.register("bob", "pw2").unwrap();

        let users = repo.load().unwrap();
        repo.save(&users).unwrap();
        assert_eq!(repo.load().unwrap(), users);
    }

    #[test]
    fn register_stores_hash_not_plaintext() {
        let (repo, dir) = setup();
        repo.register("ana", "pw1").unwrap();

        let raw = std::fs::read_to_string(dir.path().join("users.json")).unwrap();
        assert!(raw.contains("hashed:pw1"));
        assert!(!raw.contains("\"pw1\""));
    }

    #[test]
    fn duplicate_registration_is_rejected_and_harmless() {
        let (repo, _dir) = setup();
        repo.register("ana", "pw1").unwrap();
        let mut ledger = Ledger::new();
        ledger.add_income(dec!(100), "Salario").unwrap();
        repo.update_ledger("ana", &ledger).unwrap();

        assert!(matches!(
            repo.register("ana", "other"),
            Err(StorageError::UserExists(_))
        ));

        // Original credential and ledger survive the failed attempt.
        let survived = repo.authenticate("ana", "pw1").unwrap();
        assert_eq!(survived.balance(), dec!(100));
    }

    #[test]
    fn authenticate_rejects_unknown_user_and_bad_password() {
        let (repo, _dir) = setup();
        repo.register("ana", "pw1").unwrap();

        assert!(matches!(
            repo.authenticate("nadie", "pw1"),
            Err(StorageError::UnknownUser(_))
        ));
        assert!(matches!(
            repo.authenticate("ana", "wrongpw"),
            Err(StorageError::BadCredential)
        ));
    }

    #[test]
    fn update_ledger_persists_across_instances() {
        let (repo, dir) = setup();
        repo.register("ana", "pw1").unwrap();
        let mut ledger = Ledger::new();
        ledger.add_income(dec!(100), "Salario").unwrap();
        ledger.add_expense(dec!(30), "Comida").unwrap();
        repo.update_ledger("ana", &ledger).unwrap();

        let reopened =
            JsonFileRepository::new(dir.path().join("users.json"), Arc::new(MarkerHasher));
        let snapshot = reopened.authenticate("ana", "pw1").unwrap();
        assert_eq!(snapshot.balance(), dec!(70));
    }

    #[test]
    fn update_ledger_for_missing_user_fails() {
        let (repo, _dir) = setup();
        assert!(matches!(
            repo.update_ledger("nadie", &Ledger::new()),
            Err(StorageError::UnknownUser(_))
        ));
    }
}
