//! Cryptographic utilities.
//!
//! HMAC-SHA256 backs both Stripe webhook verification and password hashing.
//! Stored password hashes have the form `v2$<iterations>$<salt hex>$<dk hex>`,
//! where `dk` is PBKDF2-HMAC-SHA256 (RFC 8018) over the peppered password
//! `HMAC-SHA256(pepper, password)`. The iteration count travels with the hash
//! so it can be raised without invalidating existing accounts.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const PASSWORD_SCHEME: &str = "v2";
const SALT_LEN: usize = 16;

/// PBKDF2 rounds for new hashes.
pub const DEFAULT_PASSWORD_ITERATIONS: u32 = 100_000;
/// Fewest rounds a stored hash may claim.
pub const MIN_PASSWORD_ITERATIONS: u32 = 1_000;
/// Most rounds a stored hash may claim; bounds the cost of a login attempt.
pub const MAX_PASSWORD_ITERATIONS: u32 = 10_000_000;

fn mac_with(key: &[u8]) -> HmacSha256 {
    // HMAC accepts keys of any length; `new_from_slice` cannot fail for it.
    match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC-SHA256 accepts any key size"),
    }
}

/// Compute HMAC-SHA256 and return hex-encoded result.
///
/// The result is always 64 hex characters.
#[must_use]
pub fn hmac_sha256_hex(secret: &str, message: &str) -> String {
    let mut mac = mac_with(secret.as_bytes());
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time string comparison to prevent timing attacks.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Single-block PBKDF2-HMAC-SHA256: `T1 = U1 ^ U2 ^ ... ^ Uc`.
fn pbkdf2_sha256(key: &[u8], salt: &[u8], iterations: u32) -> [u8; 32] {
    let prf = mac_with(key);

    let mut first = prf.clone();
    first.update(salt);
    first.update(&1u32.to_be_bytes());
    let mut u = [0u8; 32];
    u.copy_from_slice(&first.finalize().into_bytes());
    let mut block = u;

    for _ in 1..iterations {
        let mut next = prf.clone();
        next.update(&u);
        u.copy_from_slice(&next.finalize().into_bytes());
        for (b, x) in block.iter_mut().zip(u.iter()) {
            *b ^= x;
        }
    }
    block
}

fn derive_password_key(pepper: &str, salt: &[u8], password: &str, iterations: u32) -> String {
    let mut peppered = mac_with(pepper.as_bytes());
    peppered.update(password.as_bytes());
    let key = peppered.finalize().into_bytes();
    hex::encode(pbkdf2_sha256(&key, salt, iterations))
}

/// Hash a password with a fresh random salt.
///
/// `iterations` is clamped to the accepted range so the hash always verifies.
#[must_use]
pub fn hash_password(password: &str, pepper: &str, iterations: u32) -> String {
    let iterations = iterations.clamp(MIN_PASSWORD_ITERATIONS, MAX_PASSWORD_ITERATIONS);
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    format!(
        "{PASSWORD_SCHEME}${iterations}${}${}",
        hex::encode(salt),
        derive_password_key(pepper, &salt, password, iterations)
    )
}

/// Check a password against a stored hash.
///
/// Malformed hashes, unknown schemes and out-of-range iteration counts never
/// verify.
#[must_use]
pub fn verify_password(password: &str, stored: &str, pepper: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(PASSWORD_SCHEME), Some(iterations), Some(salt_hex), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    if !(MIN_PASSWORD_ITERATIONS..=MAX_PASSWORD_ITERATIONS).contains(&iterations) {
        return false;
    }
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };

    constant_time_eq(
        &derive_password_key(pepper, &salt, password, iterations),
        expected,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_sha256_produces_correct_length() {
        let result = hmac_sha256_hex("key", "The quick brown fox jumps over the lazy dog");
        assert_eq!(result.len(), 64); // SHA256 = 32 bytes = 64 hex chars
    }

    #[test]
    fn hmac_sha256_known_vector() {
        assert_eq!(
            hmac_sha256_hex("key", "The quick brown fox jumps over the lazy dog"),
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn pbkdf2_known_vector() {
        // RFC 7914 section 11, first block.
        assert_eq!(
            hex::encode(pbkdf2_sha256(b"passwd", b"salt", 1)),
            "55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc"
        );
    }

    #[test]
    fn constant_time_eq_cases() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(constant_time_eq("", ""));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "ab"));
        assert!(!constant_time_eq("abc", "ABC"));
    }

    #[test]
    fn password_roundtrip() {
        let stored = hash_password("hunter22", "pepper", MIN_PASSWORD_ITERATIONS);
        assert!(stored.starts_with("v2$1000$"));
        assert_eq!(stored.split('$').count(), 4);
        assert!(verify_password("hunter22", &stored, "pepper"));
        assert!(!verify_password("hunter23", &stored, "pepper"));
        assert!(!verify_password("hunter22", &stored, "other-pepper"));
    }

    #[test]
    fn iteration_count_is_part_of_the_hash() {
        let stored = hash_password("hunter22", "pepper", 2_000);
        let downgraded = stored.replacen("v2$2000$", "v2$1000$", 1);
        assert!(verify_password("hunter22", &stored, "pepper"));
        assert!(!verify_password("hunter22", &downgraded, "pepper"));
    }

    #[test]
    fn requested_iterations_are_clamped() {
        let stored = hash_password("hunter22", "", 1);
        assert!(stored.starts_with("v2$1000$"));
        assert!(verify_password("hunter22", &stored, ""));
    }

    #[test]
    fn password_hashes_are_salted() {
        assert_ne!(
            hash_password("same", "", MIN_PASSWORD_ITERATIONS),
            hash_password("same", "", MIN_PASSWORD_ITERATIONS)
        );
    }

    #[test]
    fn malformed_hashes_never_verify() {
        assert!(!verify_password("x", "", ""));
        assert!(!verify_password("x", "v1$00$00", ""));
        assert!(!verify_password("x", "v2$1000$zz$00", ""));
        assert!(!verify_password("x", "v2$abc$00$00", ""));
        assert!(!verify_password("x", "v2$1$00$00", ""));
        assert!(!verify_password("x", "v2$4294967295$00$00", ""));
        assert!(!verify_password("x", "v2$1000$00$00$00", ""));
    }
}
