//! Argon2id password hashing.
//!
//! Hashes are PHC strings, so the salt and parameters travel with them. Both
//! operations are CPU-bound; async callers go through [`verify_blocking`].

use std::sync::OnceLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::{StoreError, StoreResult};

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> StoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StoreError::PasswordHash(e.to_string()))
}

/// Verify a password against a stored PHC hash.
///
/// A mismatch is `Ok(false)`; a malformed hash is an error.
pub fn verify_password(password: &str, hash: &str) -> StoreResult<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| StoreError::PasswordHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(StoreError::PasswordHash(e.to_string())),
    }
}

/// Verify on the blocking pool.
///
/// With `hash = None` (unknown user) a dummy hash is checked instead, so the
/// response time does not reveal whether the username exists.
pub async fn verify_blocking(password: String, hash: Option<String>) -> StoreResult<bool> {
    tokio::task::spawn_blocking(move || match hash {
        Some(hash) => verify_password(&password, &hash),
        None => {
            let dummy = dummy_hash()?;
            verify_password(&password, dummy).map(|_| false)
        }
    })
    .await?
}

fn dummy_hash() -> StoreResult<&'static str> {
    static DUMMY: OnceLock<String> = OnceLock::new();
    if let Some(hash) = DUMMY.get() {
        return Ok(hash);
    }
    let hash = hash_password("timing-equaliser")?;
    Ok(DUMMY.get_or_init(|| hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("wonderland").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("wonderland", &hash).unwrap());
        assert!(!verify_password("Wonderland", &hash).unwrap());
        assert!(!verify_password("wonderland ", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_is_error() {
        assert!(verify_password("x", "not-a-phc-string").is_err());
        assert!(verify_password("x", "").is_err());
    }

    #[tokio::test]
    async fn test_verify_blocking_unknown_user_is_false() {
        assert!(!verify_blocking("anything".into(), None).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_blocking_known_user() {
        let hash = hash_password("secret").unwrap();
        assert!(verify_blocking("secret".into(), Some(hash.clone())).await.unwrap());
        assert!(!verify_blocking("guess".into(), Some(hash)).await.unwrap());
    }
}
