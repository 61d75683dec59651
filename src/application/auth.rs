use std::sync::Arc;

use crate::domain::{validate_identifier, validate_password, PasswordHasher};
use crate::storage::CredentialStore;

use super::AppError;

/// A freshly registered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub identifier: String,
}

/// Proof of a successful login. Only [`AuthService::login`] creates one, and
/// a ledger can only be opened with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    identifier: String,
}

impl Authenticated {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// Signup and login over a credential store.
pub struct AuthService<S> {
    store: Arc<S>,
    hasher: PasswordHasher,
}

impl<S: CredentialStore> AuthService<S> {
    pub fn new(store: Arc<S>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }

    /// Register a new account. The store decides uniqueness, so two racing
    /// signups for one identifier yield exactly one success.
    pub async fn signup(&self, identifier: &str, password: &str) -> Result<Created, AppError> {
        let identifier = validate_identifier(identifier)?;
        validate_password(password)?;

        let hash = self
            .hasher
            .hash(password)
            .map_err(|e| AppError::Hashing(e.to_string()))?;

        let created = self
            .store
            .create(identifier, &hash)
            .await
            .map_err(AppError::storage("create account"))?;

        if !created {
            tracing::info!(account = %identifier, "signup rejected: identifier taken");
            return Err(AppError::AlreadyExists(identifier.to_string()));
        }

        tracing::info!(account = %identifier, "account created");
        Ok(Created {
            identifier: identifier.to_string(),
        })
    }

    /// Check credentials. Unknown identifiers and wrong passwords are
    /// indistinguishable to the caller.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<Authenticated, AppError> {
        let Ok(identifier) = validate_identifier(identifier) else {
            return Err(AppError::InvalidCredentials);
        };

        let valid = self
            .store
            .verify(identifier, password, &self.hasher)
            .await
            .map_err(AppError::storage("verify credentials"))?;

        if !valid {
            tracing::warn!(account = %identifier, "login failed");
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(account = %identifier, "login succeeded");
        Ok(Authenticated {
            identifier: identifier.to_string(),
        })
    }
}
