use std::sync::Arc;

use crate::config::Settings;
use crate::storage::{CredentialStore, LedgerStore, SqliteStore};

use super::{AppError, AuthService, Created, LedgerService, Session};

/// Everything a front end needs: accounts and their ledgers over one store.
pub struct Pocketbook<S> {
    auth: AuthService<S>,
    ledger: LedgerService<S>,
}

impl Pocketbook<SqliteStore> {
    /// Open (creating if needed) the SQLite database named in `settings`.
    pub async fn open(settings: &Settings) -> Result<Self, AppError> {
        let path = settings.database.to_string_lossy();
        let store = SqliteStore::open(&path)
            .await
            .map_err(AppError::storage("open database"))?;
        Self::with_store(store, settings)
    }
}

impl<S: CredentialStore + LedgerStore> Pocketbook<S> {
    pub fn with_store(store: S, settings: &Settings) -> Result<Self, AppError> {
        let hasher = settings
            .hashing
            .hasher()
            .map_err(|e| AppError::Configuration(format!("{:#}", e)))?;
        let store = Arc::new(store);

        Ok(Self {
            auth: AuthService::new(Arc::clone(&store), hasher),
            ledger: LedgerService::new(store, settings.categories.clone()),
        })
    }

    pub fn auth(&self) -> &AuthService<S> {
        &self.auth
    }

    pub fn ledger(&self) -> &LedgerService<S> {
        &self.ledger
    }

    pub async fn signup(&self, identifier: &str, password: &str) -> Result<Created, AppError> {
        self.auth.signup(identifier, password).await
    }

    /// Check credentials and load that account's ledger.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<Session, AppError> {
        let who = self.auth.login(identifier, password).await?;
        self.ledger.open(who).await
    }

    pub fn logout(&self, session: Session) {
        self.ledger.close(session);
    }
}
