use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Amount, CategoryPolicy, Field, ValidationError};

pub type TransactionId = Uuid;

/// Normalized on-disk and display form of a transaction date.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" => Some(TransactionKind::Income),
            "expense" => Some(TransactionKind::Expense),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A dated, categorized income or expense owned by one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Assigned once at creation; survives edits and position shifts
    pub id: TransactionId,
    /// Calendar date, serialized as `YYYY-MM-DD`
    pub date: NaiveDate,
    pub category: String,
    /// Free-form, may be empty
    pub description: String,
    /// Smallest currency unit, never negative
    pub amount: Amount,
    pub kind: TransactionKind,
}

impl Transaction {
    pub fn date_string(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }

    pub fn is_income(&self) -> bool {
        self.kind == TransactionKind::Income
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionKind::Expense
    }
}

/// Unvalidated transaction input as collected by a form or command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub date: String,
    pub kind: String,
    pub category: String,
    pub description: String,
    pub amount: Amount,
}

impl TransactionDraft {
    pub fn new(
        date: impl Into<String>,
        kind: impl Into<String>,
        category: impl Into<String>,
        amount: Amount,
    ) -> Self {
        Self {
            date: date.into(),
            kind: kind.into(),
            category: category.into(),
            description: String::new(),
            amount,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Validate and normalize the draft into a transaction carrying `id`.
    /// The first violated field is reported.
    pub fn validate(
        &self,
        id: TransactionId,
        categories: &CategoryPolicy,
    ) -> Result<Transaction, ValidationError> {
        let date = parse_date(&self.date)?;

        if self.amount < 0 {
            return Err(ValidationError::new(
                Field::Amount,
                format!("must not be negative (got {})", self.amount),
            ));
        }

        let kind = TransactionKind::from_str(&self.kind).ok_or_else(|| {
            ValidationError::new(
                Field::Kind,
                format!("expected 'income' or 'expense', got '{}'", self.kind),
            )
        })?;

        let category = self.category.trim();
        if category.is_empty() {
            return Err(ValidationError::new(Field::Category, "must not be empty"));
        }
        if !categories.accepts(category) {
            return Err(ValidationError::new(
                Field::Category,
                format!("'{}' is not a recognized category", category),
            ));
        }

        Ok(Transaction {
            id,
            date,
            category: category.to_string(),
            description: self.description.trim().to_string(),
            amount: self.amount,
            kind,
        })
    }
}

impl From<&Transaction> for TransactionDraft {
    fn from(transaction: &Transaction) -> Self {
        TransactionDraft::new(
            transaction.date_string(),
            transaction.kind.as_str(),
            transaction.category.clone(),
            transaction.amount,
        )
        .with_description(transaction.description.clone())
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(input: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).map_err(|_| {
        ValidationError::new(
            Field::Date,
            format!("'{}' is not a valid YYYY-MM-DD date", input.trim()),
        )
    })
}
