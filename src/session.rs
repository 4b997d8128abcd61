use std::{collections::HashMap, sync::RwLock};

use fintrack_core::models::Ledger;
use uuid::Uuid;

/// Opaque bearer tokens for authenticated sessions. Tokens live for the
/// lifetime of the process; closing the browser drops the cookie on the
/// client side, restarting the server drops every token here.
#[derive(Default)]
pub struct SessionStore {
    tokens: RwLock<HashMap<String, String>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a token for an authenticated username.
    pub fn open(&self, username: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens
            .write()
            .unwrap()
            .insert(token.clone(), username.to_string());
        token
    }

    pub fn resolve(&self, token: &str) -> Option<String> {
        self.tokens.read().unwrap().get(token).cloned()
    }

    pub fn close(&self, token: &str) {
        self.tokens.write().unwrap().remove(token);
    }
}

/// Process-lifetime cache of live ledgers keyed by username, avoiding a
/// re-read of the backing document on every request. Last write wins;
/// entries are never evicted, so growth is bounded only by the number of
/// distinct users seen since startup.
#[derive(Default)]
pub struct LedgerCache {
    ledgers: RwLock<HashMap<String, Ledger>>,
}

impl LedgerCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, username: &str) -> Option<Ledger> {
        self.ledgers.read().unwrap().get(username).cloned()
    }

    pub fn put(&self, username: &str, ledger: Ledger) {
        self.ledgers
            .write()
            .unwrap()
            .insert(username.to_string(), ledger);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn tokens_resolve_until_closed() {
        let sessions = SessionStore::new();
        let token = sessions.open("ana");
        assert_eq!(sessions.resolve(&token), Some("ana".to_string()));

        sessions.close(&token);
        assert_eq!(sessions.resolve(&token), None);
    }

    #[test]
    fn distinct_logins_get_distinct_tokens() {
        let sessions = SessionStore::new();
        let first = sessions.open("ana");
        let second = sessions.open("ana");
        assert_ne!(first, second);
        // Both stay valid; there is no single-session-per-user rule.
        assert_eq!(sessions.resolve(&first), Some("ana".to_string()));
        assert_eq!(sessions.resolve(&second), Some("ana".to_string()));
    }

    #[test]
    fn unknown_tokens_resolve_to_none() {
        assert_eq!(SessionStore::new().resolve("bogus"), None);
    }

    #[test]
    fn cache_last_write_wins() {
        let cache = LedgerCache::new();
        assert!(cache.get("ana").is_none());

        cache.put("ana", Ledger::new());
        let mut updated = Ledger::new();
        updated.add_income(dec!(100), "Salario").unwrap();
        cache.put("ana", updated);

        assert_eq!(cache.get("ana").unwrap().balance(), dec!(100));
    }
}
