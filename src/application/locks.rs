use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per account identifier, serializing the
/// load -> mutate -> save cycle of that account's ledger.
#[derive(Debug, Default)]
pub(crate) struct AccountLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl AccountLocks {
    pub(crate) async fn acquire(&self, identifier: &str) -> OwnedMutexGuard<()> {
        let lock = {
            // The map only holds Arc clones, so a poisoned guard is still usable
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(identifier.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_same_identifier_is_exclusive() {
        let locks = AccountLocks::default();
        let guard = locks.acquire("a").await;

        let second = tokio::time::timeout(Duration::from_millis(20), locks.acquire("a")).await;
        assert!(second.is_err());

        drop(guard);
        let third = tokio::time::timeout(Duration::from_millis(20), locks.acquire("a")).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn test_different_identifiers_do_not_block() {
        let locks = AccountLocks::default();
        let _a = locks.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_millis(20), locks.acquire("b")).await;
        assert!(b.is_ok());
    }
}
