//! Password hashing built on Argon2id.
//!
//! The work factor comes from configuration so operators can trade
//! verification latency against attack cost, and tests can run with a
//! cheap profile.

use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;

use crate::config::AuthConfig;
use crate::errors::{Error, Result};

/// One-way password hasher. Cheap to clone; construct once from config.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    /// Build a hasher with the configured Argon2id parameters.
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let params = Params::new(
            config.password_hash_memory_kib,
            config.password_hash_iterations,
            Params::DEFAULT_P_COST,
            Some(Params::DEFAULT_OUTPUT_LEN),
        )
        .map_err(|err| Error::config(format!("Invalid Argon2 parameters: {}", err)))?;

        Ok(Self { argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params) })
    }

    /// Hash a plaintext password into a PHC-format string.
    ///
    /// Empty input is an input-validation error, not a hashing failure.
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        if plaintext.is_empty() {
            return Err(Error::validation("Password cannot be empty"));
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|err| Error::internal(format!("Failed to hash password: {}", err)))?;
        Ok(hash.to_string())
    }

    /// Verify a plaintext password against a stored hash.
    ///
    /// Mismatches return `Ok(false)`; only a malformed stored hash (data
    /// corruption) is an error.
    pub fn verify(&self, plaintext: &str, stored: &str) -> Result<bool> {
        let parsed = PasswordHash::new(stored)
            .map_err(|err| Error::internal(format!("Invalid stored password hash: {}", err)))?;
        Ok(self.argon2.verify_password(plaintext.as_bytes(), &parsed).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_hasher() -> PasswordHasher {
        PasswordHasher::new(&AuthConfig {
            password_hash_memory_kib: 768,
            password_hash_iterations: 1,
            ..AuthConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_hash_and_verify_round_trip() {
        let hasher = test_hasher();
        let hash = hasher.hash("Secret1").unwrap();

        assert!(hasher.verify("Secret1", &hash).unwrap());
        assert!(!hasher.verify("Secret2", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = test_hasher();
        let first = hasher.hash("Secret1").unwrap();
        let second = hasher.hash("Secret1").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_empty_password_rejected() {
        let hasher = test_hasher();
        assert!(matches!(hasher.hash(""), Err(Error::Validation(_))));
    }

    #[test]
    fn test_malformed_stored_hash_is_an_error() {
        let hasher = test_hasher();
        assert!(hasher.verify("Secret1", "not-a-phc-string").is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn prop_verify_accepts_own_hash(password in "[a-zA-Z0-9]{1,24}") {
            let hasher = test_hasher();
            let hash = hasher.hash(&password).unwrap();
            prop_assert!(hasher.verify(&password, &hash).unwrap());
        }

        #[test]
        fn prop_verify_rejects_other_passwords(
            password in "[a-zA-Z0-9]{1,24}",
            other in "[a-zA-Z0-9]{1,24}",
        ) {
            prop_assume!(password != other);
            let hasher = test_hasher();
            let hash = hasher.hash(&password).unwrap();
            prop_assert!(!hasher.verify(&other, &hash).unwrap());
        }
    }
}
