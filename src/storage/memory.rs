use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};

use crate::domain::Transaction;

use super::{CredentialStore, LedgerSnapshot, LedgerStore, Revision};

/// Process-local store. Nothing survives a restart, so this is meant for
/// tests and throwaway sessions, never as the default.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: Mutex<HashMap<String, String>>,
    ledgers: Mutex<HashMap<String, LedgerSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|_| anyhow!("{} lock poisoned", what))
}

impl CredentialStore for MemoryStore {
    async fn create(&self, identifier: &str, password_hash: &str) -> Result<bool> {
        let mut accounts = lock(&self.accounts, "accounts")?;
        match accounts.entry(identifier.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(password_hash.to_string());
                Ok(true)
            }
        }
    }

    async fn password_hash(&self, identifier: &str) -> Result<Option<String>> {
        Ok(lock(&self.accounts, "accounts")?.get(identifier).cloned())
    }
}

impl LedgerStore for MemoryStore {
    async fn load(&self, identifier: &str) -> Result<LedgerSnapshot> {
        Ok(lock(&self.ledgers, "ledgers")?
            .get(identifier)
            .cloned()
            .unwrap_or_default())
    }

    async fn save(
        &self,
        identifier: &str,
        transactions: &[Transaction],
        expected: Revision,
    ) -> Result<Option<Revision>> {
        let mut ledgers = lock(&self.ledgers, "ledgers")?;
        let snapshot = ledgers.entry(identifier.to_string()).or_default();
        if snapshot.revision != expected {
            return Ok(None);
        }
        snapshot.transactions = transactions.to_vec();
        snapshot.revision += 1;
        Ok(Some(snapshot.revision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_verify() {
        use crate::domain::PasswordHasher;

        let store = MemoryStore::new();
        let hasher = PasswordHasher::new(8, 1, 1).unwrap();
        let hash = hasher.hash("secret").unwrap();

        assert!(store.create("lee", &hash).await.unwrap());
        assert!(!store.create("lee", "other").await.unwrap());
        assert!(store.verify("lee", "secret", &hasher).await.unwrap());
        assert!(!store.verify("lee", "Secret", &hasher).await.unwrap());
        assert!(!store.verify("park", "secret", &hasher).await.unwrap());
    }

    #[tokio::test]
    async fn test_save_bumps_revision() {
        let store = MemoryStore::new();
        assert_eq!(store.load("lee").await.unwrap().revision, 0);
        assert_eq!(store.save("lee", &[], 0).await.unwrap(), Some(1));
        assert_eq!(store.save("lee", &[], 1).await.unwrap(), Some(2));
        assert_eq!(store.save("lee", &[], 1).await.unwrap(), None);
        assert_eq!(store.load("lee").await.unwrap().revision, 2);
        assert_eq!(store.load("park").await.unwrap(), LedgerSnapshot::default());
    }
}
