//! Salted password hashing built on an `hmac`/`sha2`/`base64` stack:
//! a random salt, an HMAC-SHA256 digest of password+salt, both
//! base64-encoded and stored as `salt$digest`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SALT_BYTES: usize = 16;

/// Hashes `password` with a fresh random salt and returns the
/// on-disk form `base64(salt):base64(hmac)`.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut salt);
    let digest = hmac_digest(&salt, password);
    format!("{}:{}", BASE64.encode(salt), BASE64.encode(digest))
}

/// Verifies `password` against a stored `hash_password` output.
/// Returns `false` (never panics) on a malformed stored hash so a
/// corrupted record can't be bypassed.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_b64, digest_b64)) = stored.split_once(':') else {
        return false;
    };
    let Ok(salt) = BASE64.decode(salt_b64) else {
        return false;
    };
    let Ok(expected) = BASE64.decode(digest_b64) else {
        return false;
    };
    let mut mac = match HmacSha256::new_from_slice(&salt) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(password.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

fn hmac_digest(salt: &[u8], password: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(salt).expect("hmac accepts any key length");
    mac.update(password.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_correct_password() {
        let stored = hash_password("hunter22");
        assert!(verify_password("hunter22", &stored));
    }

    #[test]
    fn rejects_wrong_password() {
        let stored = hash_password("hunter22");
        assert!(!verify_password("wrong", &stored));
    }

    #[test]
    fn rejects_malformed_stored_hash() {
        assert!(!verify_password("anything", "not-a-valid-hash"));
    }

    #[test]
    fn distinct_hashes_for_same_password() {
        let a = hash_password("same");
        let b = hash_password("same");
        assert_ne!(a, b, "salts should differ");
    }
}
