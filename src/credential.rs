use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use fintrack_core::storage::CredentialHasher;

const SCHEME: &str = "sha256";

/// Salted SHA-256 credential hasher producing `sha256$<salt>$<digest>`
/// strings, with a fresh random salt per hash.
#[derive(Debug, Clone, Default)]
pub struct Sha256Hasher;

impl Sha256Hasher {
    pub fn new() -> Self {
        Self
    }

    fn digest_hex(salt: &str, plaintext: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(b"$");
        hasher.update(plaintext.as_bytes());
        let digest = hasher.finalize();

        let mut output = String::with_capacity(digest.len() * 2);
        for byte in digest {
            output.push(hex_char(byte >> 4));
            output.push(hex_char(byte & 0x0f));
        }
        output
    }
}

fn hex_char(nibble: u8) -> char {
    debug_assert!(nibble < 16);
    if nibble < 10 {
        (b'0' + nibble) as char
    } else {
        (b'a' + nibble - 10) as char
    }
}

impl CredentialHasher for Sha256Hasher {
    fn hash(&self, plaintext: &str) -> String {
        let salt = Uuid::new_v4().simple().to_string();
        let digest = Self::digest_hex(&salt, plaintext);
        format!("{SCHEME}${salt}${digest}")
    }

    fn verify(&self, plaintext: &str, stored: &str) -> bool {
        let mut parts = stored.splitn(3, '$');
        let (scheme, salt, expected) = match (parts.next(), parts.next(), parts.next()) {
            (Some(scheme), Some(salt), Some(expected)) => (scheme, salt, expected),
            _ => return false,
        };
        if scheme != SCHEME {
            return false;
        }
        let candidate = Self::digest_hex(salt, plaintext);
        candidate.as_bytes().ct_eq(expected.as_bytes()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_accepts_the_original_password() {
        let hasher = Sha256Hasher::new();
        let stored = hasher.hash("pw1");
        assert!(hasher.verify("pw1", &stored));
    }

    #[test]
    fn verify_rejects_other_passwords() {
        let hasher = Sha256Hasher::new();
        let stored = hasher.hash("pw1");
        assert!(!hasher.verify("pw2", &stored));
        assert!(!hasher.verify("", &stored));
    }

    #[test]
    fn salts_make_hashes_unique() {
        let hasher = Sha256Hasher::new();
        assert_ne!(hasher.hash("pw1"), hasher.hash("pw1"));
    }

    #[test]
    fn verify_rejects_malformed_stored_values() {
        let hasher = Sha256Hasher::new();
        assert!(!hasher.verify("pw1", ""));
        assert!(!hasher.verify("pw1", "pw1"));
        assert!(!hasher.verify("pw1", "md5$salt$digest"));
    }

    #[test]
    fn stored_value_never_contains_the_plaintext() {
        let hasher = Sha256Hasher::new();
        assert!(!hasher.hash("hunter2").contains("hunter2"));
    }
}
