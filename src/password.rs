use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::config::PasswordHashConfig;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(String),

    #[error("stored hash is malformed: {0}")]
    InvalidHash(String),

    #[error("hashing task failed: {0}")]
    Join(String),
}

/// PasswordHasher
///
/// Argon2id with a work factor fixed at startup. Hashing and verification are CPU-bound,
/// so the async entry points move the work onto tokio's blocking pool.
#[derive(Clone, Copy, Debug)]
pub struct PasswordHasher {
    cost: PasswordHashConfig,
}

impl PasswordHasher {
    pub fn new(cost: PasswordHashConfig) -> Self {
        Self { cost }
    }

    fn argon2(&self) -> Result<Argon2<'static>, PasswordError> {
        let params = Params::new(
            self.cost.memory_kib,
            self.cost.iterations,
            self.cost.parallelism,
            None,
        )
        .map_err(|e| PasswordError::Hash(format!("invalid parameters: {e}")))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Produces a PHC string (`$argon2id$v=19$m=...`) with a fresh random salt.
    pub fn hash_blocking(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::Hash(e.to_string()))
    }

    /// `Ok(false)` on mismatch; `Err` only when the stored hash cannot be parsed.
    /// Cost parameters are read from the hash itself.
    pub fn verify_blocking(password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::InvalidHash(e.to_string())),
        }
    }

    pub async fn hash(&self, password: String) -> Result<String, PasswordError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.hash_blocking(&password))
            .await
            .map_err(|e| PasswordError::Join(e.to_string()))?
    }

    pub async fn verify(password: String, hash: String) -> Result<bool, PasswordError> {
        tokio::task::spawn_blocking(move || Self::verify_blocking(&password, &hash))
            .await
            .map_err(|e| PasswordError::Join(e.to_string()))?
    }

    /// Runs one Argon2 computation at the configured cost and discards it. Login calls this
    /// when the email is unknown so that path costs the same as a wrong password.
    pub async fn dummy_verify(&self, password: String) -> Result<(), PasswordError> {
        self.hash(password).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(PasswordHashConfig::fast())
    }

    #[test]
    fn hash_embeds_configured_cost() {
        let hash = hasher().hash_blocking("hunter2").unwrap();
        assert!(hash.starts_with("$argon2id$v=19$"));
        assert!(hash.contains("m=8,t=1,p=1"));
    }

    #[test]
    fn same_password_gets_different_salts() {
        let h = hasher();
        assert_ne!(h.hash_blocking("same").unwrap(), h.hash_blocking("same").unwrap());
    }

    #[test]
    fn verify_accepts_right_and_rejects_wrong_password() {
        let hash = hasher().hash_blocking("correct horse").unwrap();
        assert!(PasswordHasher::verify_blocking("correct horse", &hash).unwrap());
        assert!(!PasswordHasher::verify_blocking("battery staple", &hash).unwrap());
        assert!(!PasswordHasher::verify_blocking("", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(PasswordHasher::verify_blocking("pw", "not-a-hash").is_err());
    }

    #[tokio::test]
    async fn async_roundtrip() {
        let hash = hasher().hash("s3cret".to_string()).await.unwrap();
        assert!(PasswordHasher::verify("s3cret".to_string(), hash).await.unwrap());
    }
}
