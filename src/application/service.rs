use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{
    position_of, sorted_rows, summarize, summarize_range, CategoryPolicy, DateRange, LedgerRow,
    SortBy, SortOrder, Summary, Transaction, TransactionDraft, TransactionId,
};
use crate::storage::{LedgerStore, Revision};

use super::locks::AccountLocks;
use super::{AppError, Authenticated};

/// How many times a mutation is replayed when other processes keep saving
/// the same ledger between its load and its save.
const SAVE_ATTEMPTS: usize = 5;

/// One account's ledger as loaded by [`LedgerService::open`].
///
/// The session is the explicit "who is logged in" context: every ledger
/// operation takes it, and any number of sessions can be alive at once.
#[derive(Debug, Clone)]
pub struct Session {
    identifier: String,
    transactions: Vec<Transaction>,
    revision: Revision,
}

impl Session {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Transactions in stored (insertion) order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Revision of the stored ledger this session last saw.
    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Transaction> {
        self.transactions.get(position)
    }
}

/// Application service for a user's transactions.
/// Every mutation is persisted before it returns.
pub struct LedgerService<S> {
    store: Arc<S>,
    categories: CategoryPolicy,
    locks: AccountLocks,
}

impl<S: LedgerStore> LedgerService<S> {
    pub fn new(store: Arc<S>, categories: CategoryPolicy) -> Self {
        Self {
            store,
            categories,
            locks: AccountLocks::default(),
        }
    }

    pub fn categories(&self) -> &CategoryPolicy {
        &self.categories
    }

    // ========================
    // Session lifecycle
    // ========================

    /// Load the authenticated account's ledger into a new session.
    pub async fn open(&self, who: Authenticated) -> Result<Session, AppError> {
        let identifier = who.identifier().to_string();
        let snapshot = self
            .store
            .load(&identifier)
            .await
            .map_err(AppError::storage("load ledger"))?;

        tracing::info!(
            account = %identifier,
            transactions = snapshot.transactions.len(),
            revision = snapshot.revision,
            "ledger opened"
        );

        Ok(Session {
            identifier,
            transactions: snapshot.transactions,
            revision: snapshot.revision,
        })
    }

    /// Refresh a session from storage, e.g. after a [`AppError::StaleLedger`].
    pub async fn reload(&self, session: &mut Session) -> Result<(), AppError> {
        let snapshot = self
            .store
            .load(&session.identifier)
            .await
            .map_err(AppError::storage("load ledger"))?;
        session.transactions = snapshot.transactions;
        session.revision = snapshot.revision;
        Ok(())
    }

    /// Release a session. Nothing is pending: mutations are saved eagerly.
    pub fn close(&self, session: Session) {
        tracing::info!(account = %session.identifier, revision = session.revision, "ledger closed");
    }

    // ========================
    // Mutations
    // ========================

    /// Append a transaction. Returns the new ledger length; the new
    /// transaction sits at position `length - 1`.
    pub async fn add(
        &self,
        session: &mut Session,
        draft: &TransactionDraft,
    ) -> Result<usize, AppError> {
        let transaction = draft.validate(Uuid::new_v4(), &self.categories)?;
        let id = transaction.id;

        let len = self
            .mutate(session, false, |transactions| {
                transactions.push(transaction.clone());
                Ok(transactions.len())
            })
            .await?;

        tracing::info!(account = %session.identifier, position = len - 1, %id, "transaction added");
        Ok(len)
    }

    /// Replace the transaction at `position`, keeping its position and id.
    ///
    /// Fails with [`AppError::StaleLedger`] if the stored ledger changed since
    /// the session last saw it, since `position` may then name another record.
    pub async fn edit(
        &self,
        session: &mut Session,
        position: usize,
        draft: &TransactionDraft,
    ) -> Result<Transaction, AppError> {
        let updated = self
            .mutate(session, true, |transactions| {
                let size = transactions.len();
                let slot = transactions
                    .get_mut(position)
                    .ok_or(AppError::OutOfRange { position, size })?;
                let updated = draft.validate(slot.id, &self.categories)?;
                *slot = updated.clone();
                Ok(updated)
            })
            .await
            .inspect_err(|e| log_rejection(&session.identifier, "edit", e))?;

        tracing::info!(
            account = %session.identifier,
            position,
            id = %updated.id,
            "transaction edited"
        );
        Ok(updated)
    }

    /// Remove the transaction at `position`; later transactions shift down by one.
    /// Guarded against stale positions like [`LedgerService::edit`].
    pub async fn delete(
        &self,
        session: &mut Session,
        position: usize,
    ) -> Result<Transaction, AppError> {
        let removed = self
            .mutate(session, true, |transactions| {
                let size = transactions.len();
                if position >= size {
                    return Err(AppError::OutOfRange { position, size });
                }
                Ok(transactions.remove(position))
            })
            .await
            .inspect_err(|e| log_rejection(&session.identifier, "delete", e))?;

        tracing::info!(
            account = %session.identifier,
            position,
            id = %removed.id,
            "transaction deleted"
        );
        Ok(removed)
    }

    /// Replace a transaction addressed by id, wherever it currently sits.
    pub async fn edit_by_id(
        &self,
        session: &mut Session,
        id: TransactionId,
        draft: &TransactionDraft,
    ) -> Result<Transaction, AppError> {
        let updated = draft.validate(id, &self.categories)?;

        let position = self
            .mutate(session, false, |transactions| {
                let position =
                    position_of(transactions, id).ok_or(AppError::TransactionNotFound(id))?;
                transactions[position] = updated.clone();
                Ok(position)
            })
            .await
            .inspect_err(|e| log_rejection(&session.identifier, "edit", e))?;

        tracing::info!(account = %session.identifier, position, %id, "transaction edited");
        Ok(updated)
    }

    /// Remove a transaction addressed by id, wherever it currently sits.
    pub async fn delete_by_id(
        &self,
        session: &mut Session,
        id: TransactionId,
    ) -> Result<Transaction, AppError> {
        let (position, removed) = self
            .mutate(session, false, |transactions| {
                let position =
                    position_of(transactions, id).ok_or(AppError::TransactionNotFound(id))?;
                Ok((position, transactions.remove(position)))
            })
            .await
            .inspect_err(|e| log_rejection(&session.identifier, "delete", e))?;

        tracing::info!(account = %session.identifier, position, %id, "transaction deleted");
        Ok(removed)
    }

    /// Run a load -> mutate -> save cycle under the account's lock.
    ///
    /// The mutation always applies to the freshest stored ledger. With
    /// `require_current`, a session whose revision lags the store is refused
    /// before `apply` runs. The save only lands if the stored revision is
    /// still the one loaded; when another process saved in between, the cycle
    /// starts over from a fresh load. Nothing is saved if `apply` fails, and
    /// the session is only updated after a successful save.
    async fn mutate<T>(
        &self,
        session: &mut Session,
        require_current: bool,
        mut apply: impl FnMut(&mut Vec<Transaction>) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let _guard = self.locks.acquire(&session.identifier).await;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let current = self
                .store
                .load(&session.identifier)
                .await
                .map_err(AppError::storage("load ledger"))?;

            if require_current && current.revision != session.revision {
                return Err(AppError::StaleLedger {
                    expected: session.revision,
                    found: current.revision,
                });
            }

            let mut transactions = current.transactions;
            let output = apply(&mut transactions)?;

            let saved = self
                .store
                .save(&session.identifier, &transactions, current.revision)
                .await
                .map_err(AppError::storage("save ledger"))?;

            match saved {
                Some(revision) => {
                    session.transactions = transactions;
                    session.revision = revision;
                    return Ok(output);
                }
                None if attempt < SAVE_ATTEMPTS => {
                    tracing::debug!(
                        account = %session.identifier,
                        revision = current.revision,
                        attempt,
                        "ledger saved elsewhere meanwhile, retrying"
                    );
                }
                None => {
                    let found = self
                        .store
                        .load(&session.identifier)
                        .await
                        .map_err(AppError::storage("load ledger"))?
                        .revision;
                    return Err(AppError::StaleLedger {
                        expected: current.revision,
                        found,
                    });
                }
            }
        }
    }

    // ========================
    // Queries
    // ========================

    /// Ordered view of the session's ledger. Stored order is untouched.
    pub fn list(&self, session: &Session, by: SortBy, order: SortOrder) -> Vec<LedgerRow> {
        sorted_rows(&session.transactions, by, order)
    }

    pub fn aggregate(&self, session: &Session) -> Summary {
        summarize(&session.transactions)
    }

    pub fn aggregate_between(&self, session: &Session, range: DateRange) -> Summary {
        summarize_range(&session.transactions, range)
    }
}

fn log_rejection(identifier: &str, operation: &str, err: &AppError) {
    if err.is_recoverable() {
        tracing::warn!(account = %identifier, operation, error = %err, "ledger change rejected");
    } else {
        tracing::error!(account = %identifier, operation, error = %err, "ledger change failed");
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Result};

    use super::*;
    use crate::storage::{LedgerSnapshot, MemoryStore};

    /// Loads from memory, but every save fails.
    #[derive(Default)]
    struct ReadOnlyStore {
        inner: MemoryStore,
    }

    impl LedgerStore for ReadOnlyStore {
        async fn load(&self, identifier: &str) -> Result<LedgerSnapshot> {
            self.inner.load(identifier).await
        }

        async fn save(
            &self,
            _identifier: &str,
            _transactions: &[Transaction],
            _expected: Revision,
        ) -> Result<Option<Revision>> {
            Err(anyhow!("disk I/O error"))
        }
    }

    fn draft(amount: i64) -> TransactionDraft {
        TransactionDraft::new("2024-05-01", "expense", "food", amount)
    }

    async fn seeded(store: &ReadOnlyStore, identifier: &str) -> Session {
        let first = draft(10)
            .validate(Uuid::new_v4(), &CategoryPolicy::default())
            .unwrap();
        store.inner.save(identifier, &[first], 0).await.unwrap();
        let snapshot = store.inner.load(identifier).await.unwrap();
        Session {
            identifier: identifier.to_string(),
            transactions: snapshot.transactions,
            revision: snapshot.revision,
        }
    }

    fn assert_save_failed(err: AppError) {
        match err {
            AppError::StorageFailure { operation, cause } => {
                assert_eq!(operation, "save ledger");
                assert!(cause.to_string().contains("disk I/O error"));
            }
            other => panic!("expected a storage failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_save_leaves_session_untouched() {
        let store = Arc::new(ReadOnlyStore::default());
        let service = LedgerService::new(store, CategoryPolicy::default());
        let mut session = seeded(&service.store, "mina").await;
        let before = session.clone();

        assert_save_failed(service.add(&mut session, &draft(20)).await.unwrap_err());
        assert_save_failed(service.edit(&mut session, 0, &draft(30)).await.unwrap_err());
        assert_save_failed(service.delete(&mut session, 0).await.unwrap_err());
        let id = before.transactions[0].id;
        assert_save_failed(service.delete_by_id(&mut session, id).await.unwrap_err());

        assert_eq!(session.transactions(), before.transactions());
        assert_eq!(session.revision(), before.revision());
        let stored = service.store.load("mina").await.unwrap();
        assert_eq!(stored.transactions, before.transactions);
    }

    /// Lets one other writer slip in before the first save.
    struct RacingStore {
        inner: MemoryStore,
        intruder: std::sync::Mutex<Option<Transaction>>,
    }

    impl LedgerStore for RacingStore {
        async fn load(&self, identifier: &str) -> Result<LedgerSnapshot> {
            self.inner.load(identifier).await
        }

        async fn save(
            &self,
            identifier: &str,
            transactions: &[Transaction],
            expected: Revision,
        ) -> Result<Option<Revision>> {
            let intruder = self.intruder.lock().unwrap().take();
            if let Some(intruder) = intruder {
                let mut current = self.inner.load(identifier).await?;
                current.transactions.push(intruder);
                self.inner
                    .save(identifier, &current.transactions, current.revision)
                    .await?;
            }
            self.inner.save(identifier, transactions, expected).await
        }
    }

    #[tokio::test]
    async fn test_add_replays_onto_a_ledger_saved_elsewhere() {
        let intruder = draft(1)
            .validate(Uuid::new_v4(), &CategoryPolicy::default())
            .unwrap();
        let store = RacingStore {
            inner: MemoryStore::new(),
            intruder: std::sync::Mutex::new(Some(intruder)),
        };
        let service = LedgerService::new(Arc::new(store), CategoryPolicy::default());
        let mut session = Session {
            identifier: "mina".to_string(),
            transactions: Vec::new(),
            revision: 0,
        };

        let len = service.add(&mut session, &draft(2)).await.unwrap();

        assert_eq!(len, 2);
        assert_eq!(session.revision(), 2);
        let amounts: Vec<i64> = session.transactions().iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_edit_refuses_a_ledger_saved_elsewhere() {
        let intruder = draft(1)
            .validate(Uuid::new_v4(), &CategoryPolicy::default())
            .unwrap();
        let store = RacingStore {
            inner: MemoryStore::new(),
            intruder: std::sync::Mutex::new(None),
        };
        let first = draft(10)
            .validate(Uuid::new_v4(), &CategoryPolicy::default())
            .unwrap();
        store.inner.save("mina", &[first], 0).await.unwrap();
        *store.intruder.lock().unwrap() = Some(intruder);

        let service = LedgerService::new(Arc::new(store), CategoryPolicy::default());
        let snapshot = service.store.load("mina").await.unwrap();
        let mut session = Session {
            identifier: "mina".to_string(),
            transactions: snapshot.transactions,
            revision: snapshot.revision,
        };

        let err = service.edit(&mut session, 0, &draft(99)).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::StaleLedger {
                expected: 1,
                found: 2
            }
        ));
        assert_eq!(session.revision(), 1);
        let stored = service.store.load("mina").await.unwrap();
        let amounts: Vec<i64> = stored.transactions.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![10, 1]);
    }
}
