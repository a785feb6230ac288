//! Password hashing and session token generation.
//!
//! Stored credentials are argon2id PHC strings (`$argon2id$v=19$...`).
//! Values without the `$argon2` prefix are legacy plaintext passwords carried
//! over from old exports; they still verify, and callers are expected to
//! re-hash them on success.

use argon2::Argon2;
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::constants::{PHC_PREFIX, SESSION_TOKEN_SIZE};
use crate::error::CredentialError;

/// Hash a password with argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialError::Hash(e.to_string()))
}

/// Whether a stored value is a legacy plaintext password.
pub fn is_legacy(stored: &str) -> bool {
    !stored.starts_with(PHC_PREFIX)
}

/// Check `candidate` against a stored credential.
///
/// Legacy plaintext is compared in constant time; argon2 does its own
/// constant-time comparison of the derived hash.
pub fn verify_password(stored: &str, candidate: &str) -> Result<bool, CredentialError> {
    if is_legacy(stored) {
        return Ok(constant_time_eq(stored.as_bytes(), candidate.as_bytes()));
    }

    let parsed = PasswordHash::new(stored).map_err(|_| CredentialError::Malformed)?;
    match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(_) => Err(CredentialError::Malformed),
    }
}

/// Length-checked constant-time byte comparison.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.ct_eq(b).unwrap_u8() == 1
}

/// Random session token, hex encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_verify() {
        let stored = hash_password("s3cret").unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert!(!stored.contains("s3cret"));
        assert!(!is_legacy(&stored));
        assert!(verify_password(&stored, "s3cret").unwrap());
        assert!(!verify_password(&stored, "S3cret").unwrap());
    }

    #[test]
    fn test_salt_is_random() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_legacy_plaintext() {
        assert!(is_legacy("admin"));
        assert!(verify_password("admin", "admin").unwrap());
        assert!(!verify_password("admin", "admin ").unwrap());
    }

    #[test]
    fn test_malformed_hash() {
        assert_eq!(
            verify_password("$argon2id$v=19$m=19456,t=2,p=1$!!!!$####", "x"),
            Err(CredentialError::Malformed)
        );
    }

    #[test]
    fn test_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), SESSION_TOKEN_SIZE * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
