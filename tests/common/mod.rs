// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use pocketbook::application::Session;
use pocketbook::config::{HashingSettings, Settings};
use pocketbook::domain::{CategoryPolicy, TransactionDraft};
use pocketbook::{Pocketbook, SqliteStore};
use tempfile::TempDir;

/// Settings pointing at a database inside `dir`, with cheap hashing
pub fn test_settings(dir: &TempDir) -> Settings {
    Settings {
        database: dir.path().join("test.db"),
        hashing: HashingSettings {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        },
        categories: CategoryPolicy::default(),
    }
}

/// Helper to create a pocketbook over a temporary database
pub async fn test_book() -> Result<(Pocketbook<SqliteStore>, TempDir)> {
    let temp_dir = TempDir::new()?;
    let book = Pocketbook::open(&test_settings(&temp_dir)).await?;
    Ok((book, temp_dir))
}

/// Sign up and log in a fresh account
pub async fn signed_in(book: &Pocketbook<SqliteStore>, identifier: &str) -> Result<Session> {
    book.signup(identifier, "correct horse").await?;
    Ok(book.login(identifier, "correct horse").await?)
}

pub fn expense(date: &str, category: &str, amount: i64) -> TransactionDraft {
    TransactionDraft::new(date, "expense", category, amount)
}

pub fn income(date: &str, category: &str, amount: i64) -> TransactionDraft {
    TransactionDraft::new(date, "income", category, amount)
}

/// Amounts in stored order, handy for asserting on shifts
pub fn amounts(session: &Session) -> Vec<i64> {
    session.transactions().iter().map(|t| t.amount).collect()
}
