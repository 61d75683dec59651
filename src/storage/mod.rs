mod memory;
mod sqlite;

use anyhow::Result;

use crate::domain::{PasswordHasher, Transaction};

pub use memory::*;
pub use sqlite::*;

/// SQL migration for initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// Counter bumped by every save of an account's ledger. 0 means never saved.
pub type Revision = i64;

/// A ledger as last persisted, with the revision it was saved under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub transactions: Vec<Transaction>,
    pub revision: Revision,
}

/// Durable mapping from account identifier to password hash.
#[allow(async_fn_in_trait)]
pub trait CredentialStore {
    /// Insert a new account. Returns false, without touching the existing
    /// record, if the identifier is already taken. Atomic per identifier.
    async fn create(&self, identifier: &str, password_hash: &str) -> Result<bool>;

    /// Fetch the stored hash for an identifier.
    async fn password_hash(&self, identifier: &str) -> Result<Option<String>>;

    /// True iff the identifier exists and `password` matches its stored hash.
    /// An unknown identifier costs the same hashing work as a wrong password.
    async fn verify(
        &self,
        identifier: &str,
        password: &str,
        hasher: &PasswordHasher,
    ) -> Result<bool> {
        Ok(match self.password_hash(identifier).await? {
            Some(hash) => hasher.verify(password, &hash),
            None => hasher.verify_unknown(password),
        })
    }
}

/// One ordered transaction sequence per account identifier.
#[allow(async_fn_in_trait)]
pub trait LedgerStore {
    /// Load an account's ledger. An account with no saved data yields an
    /// empty ledger at revision 0.
    async fn load(&self, identifier: &str) -> Result<LedgerSnapshot>;

    /// Replace the whole stored sequence for an account, all or nothing, if
    /// the stored revision still equals `expected`. Returns the new revision,
    /// or `None` without writing anything when another writer got there first.
    async fn save(
        &self,
        identifier: &str,
        transactions: &[Transaction],
        expected: Revision,
    ) -> Result<Option<Revision>>;
}
