use argon2::password_hash::{self, PasswordHash, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand_core::OsRng;

/// Argon2id hashing with deploy-time tunable cost.
///
/// Every hash gets a fresh random salt and is stored as a PHC string, which
/// embeds the algorithm, cost and salt. Verification reads those back from the
/// stored string, so raising the cost later does not invalidate older hashes.
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, password_hash::Error> {
        let params = Params::new(memory_kib, iterations, parallelism, None)?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, password: &str) -> Result<String, password_hash::Error> {
        use argon2::PasswordHasher as _;

        let salt = SaltString::generate(&mut OsRng);
        let hash = self.argon2().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// Check `password` against a stored PHC hash string.
    /// Returns false for a wrong password and for a malformed stored hash.
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        match PasswordHash::new(stored_hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Stand-in for [`PasswordHasher::verify`] when there is no stored hash.
    /// Always false, but spends one hash at the current cost first so an
    /// unknown account takes as long to reject as a wrong password.
    pub fn verify_unknown(&self, password: &str) -> bool {
        let _ = self.hash(password);
        false
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("memory_kib", &self.params.m_cost())
            .field("iterations", &self.params.t_cost())
            .field("parallelism", &self.params.p_cost())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> PasswordHasher {
        PasswordHasher::new(8, 1, 1).unwrap()
    }

    #[test]
    fn test_hash_then_verify() {
        let hasher = cheap();
        let hash = hasher.hash("hunter2").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("hunter2"));
        assert!(hasher.verify("hunter2", &hash));
        assert!(!hasher.verify("hunter3", &hash));
        assert!(!hasher.verify("hunter2 ", &hash));
    }

    #[test]
    fn test_salt_is_random() {
        let hasher = cheap();
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn test_verify_across_cost_changes() {
        let hash = cheap().hash("pw").unwrap();
        let stronger = PasswordHasher::new(16, 2, 1).unwrap();
        assert!(stronger.verify("pw", &hash));
    }

    #[test]
    fn test_malformed_hash_does_not_verify() {
        assert!(!cheap().verify("pw", "not-a-hash"));
    }

    #[test]
    fn test_unknown_account_never_verifies() {
        let hasher = cheap();
        assert!(!hasher.verify_unknown("pw"));
        assert!(!hasher.verify_unknown(""));
    }

    #[test]
    fn test_invalid_params_are_rejected() {
        assert!(PasswordHasher::new(0, 0, 0).is_err());
    }
}
