use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{Transaction, TransactionKind, DATE_FORMAT};

use super::{CredentialStore, LedgerSnapshot, LedgerStore, Revision, MIGRATION_001_INITIAL};

/// Durable store for accounts and ledgers in a single SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Open (creating if needed) the database file at `path` and migrate it.
    pub async fn open(path: &str) -> Result<Self> {
        let store = Self::connect(&format!("sqlite:{}?mode=rwc", path)).await?;
        store.migrate().await?;
        Ok(store)
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction> {
        let id_str: String = row.get("id");
        let date_str: String = row.get("date");
        let kind_str: String = row.get("kind");

        Ok(Transaction {
            id: Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
            date: NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
                .with_context(|| format!("Invalid transaction date: {}", date_str))?,
            category: row.get("category"),
            description: row.get("description"),
            amount: row.get("amount"),
            kind: TransactionKind::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction kind: {}", kind_str))?,
        })
    }
}

impl CredentialStore for SqliteStore {
    async fn create(&self, identifier: &str, password_hash: &str) -> Result<bool> {
        // The primary key makes the existence check and the insert one statement
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (identifier, password_hash, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(identifier) DO NOTHING
            "#,
        )
        .bind(identifier)
        .bind(password_hash)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to create account")?;

        Ok(result.rows_affected() == 1)
    }

    async fn password_hash(&self, identifier: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT password_hash FROM accounts WHERE identifier = ?")
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch account")?;

        Ok(row.map(|row| row.get("password_hash")))
    }
}

impl LedgerStore for SqliteStore {
    async fn load(&self, identifier: &str) -> Result<LedgerSnapshot> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin ledger load")?;

        let revision: Revision = sqlx::query("SELECT revision FROM ledgers WHERE account = ?")
            .bind(identifier)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to fetch ledger revision")?
            .map(|row| row.get::<Revision, _>("revision"))
            .unwrap_or(0);

        let rows = sqlx::query(
            r#"
            SELECT id, date, category, description, amount, kind
            FROM ledger_entries
            WHERE account = ?
            ORDER BY position
            "#,
        )
        .bind(identifier)
        .fetch_all(&mut *tx)
        .await
        .context("Failed to load ledger entries")?;

        tx.commit().await.context("Failed to finish ledger load")?;

        let transactions = rows
            .iter()
            .map(Self::row_to_transaction)
            .collect::<Result<Vec<_>>>()?;

        Ok(LedgerSnapshot {
            transactions,
            revision,
        })
    }

    async fn save(
        &self,
        identifier: &str,
        transactions: &[Transaction],
        expected: Revision,
    ) -> Result<Option<Revision>> {
        // Dropping the transaction before commit rolls everything back
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin ledger save")?;

        // Claim the next revision first: the write lock is taken here, so a
        // concurrent saver from another connection waits, then misses.
        let claim = if expected == 0 {
            sqlx::query(
                r#"
                INSERT INTO ledgers (account, revision, updated_at)
                VALUES (?, 1, ?)
                ON CONFLICT(account) DO NOTHING
                "#,
            )
            .bind(identifier)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await
        } else {
            sqlx::query(
                r#"
                UPDATE ledgers
                SET revision = revision + 1, updated_at = ?
                WHERE account = ? AND revision = ?
                "#,
            )
            .bind(Utc::now().to_rfc3339())
            .bind(identifier)
            .bind(expected)
            .execute(&mut *tx)
            .await
        };

        if claim.context("Failed to bump ledger revision")?.rows_affected() != 1 {
            return Ok(None);
        }

        sqlx::query("DELETE FROM ledger_entries WHERE account = ?")
            .bind(identifier)
            .execute(&mut *tx)
            .await
            .context("Failed to clear ledger entries")?;

        for (position, transaction) in transactions.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO ledger_entries
                    (account, position, id, date, category, description, amount, kind)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(identifier)
            .bind(position as i64)
            .bind(transaction.id.to_string())
            .bind(transaction.date_string())
            .bind(&transaction.category)
            .bind(&transaction.description)
            .bind(transaction.amount)
            .bind(transaction.kind.as_str())
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to write ledger entry at position {}", position))?;
        }

        tx.commit().await.context("Failed to commit ledger save")?;

        Ok(Some(expected + 1))
    }
}
