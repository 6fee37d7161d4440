use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use once_cell::sync::OnceCell;
use std::sync::Arc;

use super::AuthError;

/// Plaintext hashed when the looked-up account does not exist, so a miss costs
/// the same as a wrong password.
const DUMMY_PASSWORD: &str = "uniform-store-dummy-password";

/// Cost parameters for argon2id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHashConfig {
    pub memory_kib: u32,
    pub iterations: u32,
}

impl Default for PasswordHashConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
        }
    }
}

/// Salted one-way password hashing. Hashing runs on the blocking pool.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
    dummy_hash: Arc<OnceCell<String>>,
}

impl PasswordHasher {
    pub fn new(config: PasswordHashConfig) -> Result<Self, AuthError> {
        let params = Params::new(config.memory_kib, config.iterations, 1, None)
            .map_err(|e| AuthError::Hash(e.to_string()))?;
        Ok(Self {
            params,
            dummy_hash: Arc::new(OnceCell::new()),
        })
    }

    fn argon2(params: Params) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    }

    fn hash_blocking(params: Params, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Self::argon2(params)
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hash(e.to_string()))
    }

    fn verify_blocking(params: Params, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Hash(e.to_string()))?;
        Ok(Self::argon2(params)
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// PHC-formatted argon2id hash of `password`
    pub async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let params = self.params.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || Self::hash_blocking(params, &password))
            .await
            .map_err(|e| AuthError::Hash(e.to_string()))?
    }

    /// Checks `password` against `hash`. With no stored hash the dummy hash
    /// is verified instead and the result is always `false`.
    pub async fn verify(&self, password: &str, hash: Option<&str>) -> Result<bool, AuthError> {
        let params = self.params.clone();
        let password = password.to_owned();
        let stored = hash.map(str::to_owned);
        let dummy = Arc::clone(&self.dummy_hash);

        tokio::task::spawn_blocking(move || match stored {
            Some(stored) => Self::verify_blocking(params, &password, &stored),
            None => {
                let dummy_hash = dummy
                    .get_or_try_init(|| Self::hash_blocking(params.clone(), DUMMY_PASSWORD))?;
                Self::verify_blocking(params, &password, dummy_hash)?;
                Ok(false)
            }
        })
        .await
        .map_err(|e| AuthError::Hash(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher() -> PasswordHasher {
        PasswordHasher::new(PasswordHashConfig {
            memory_kib: 64,
            iterations: 1,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn hash_verifies_only_the_original_password() {
        let hasher = fast_hasher();
        let hash = hasher.hash("correct horse").await.unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("correct horse"));
        assert!(hasher.verify("correct horse", Some(&hash)).await.unwrap());
        assert!(!hasher.verify("wrong horse", Some(&hash)).await.unwrap());
    }

    #[tokio::test]
    async fn hashes_are_salted() {
        let hasher = fast_hasher();
        let first = hasher.hash("same").await.unwrap();
        let second = hasher.hash("same").await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn missing_hash_never_verifies() {
        let hasher = fast_hasher();
        assert!(!hasher.verify(DUMMY_PASSWORD, None).await.unwrap());
    }

    #[test]
    fn invalid_cost_is_rejected() {
        let result = PasswordHasher::new(PasswordHashConfig {
            memory_kib: 1,
            iterations: 0,
        });
        assert!(matches!(result, Err(AuthError::Hash(_))));
    }
}
