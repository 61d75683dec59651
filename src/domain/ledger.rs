use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Total, Transaction, TransactionId, TransactionKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    Date,
    Amount,
    Category,
    /// Stored order, i.e. the order transactions were added in
    Insertion,
}

impl SortBy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "date" => Some(SortBy::Date),
            "amount" => Some(SortBy::Amount),
            "category" => Some(SortBy::Category),
            "insertion" | "position" => Some(SortBy::Insertion),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Some(SortOrder::Ascending),
            "desc" | "descending" => Some(SortOrder::Descending),
            _ => None,
        }
    }
}

/// A transaction together with its current position in the stored sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub position: usize,
    pub transaction: Transaction,
}

/// Produce an ordered copy of `transactions`. The input is never reordered.
/// Equal keys keep insertion order regardless of direction.
pub fn sorted_rows(transactions: &[Transaction], by: SortBy, order: SortOrder) -> Vec<LedgerRow> {
    let mut rows: Vec<LedgerRow> = transactions
        .iter()
        .enumerate()
        .map(|(position, transaction)| LedgerRow {
            position,
            transaction: transaction.clone(),
        })
        .collect();

    let key = |a: &LedgerRow, b: &LedgerRow| -> Ordering {
        let (a, b) = (&a.transaction, &b.transaction);
        match by {
            SortBy::Date => a.date.cmp(&b.date),
            SortBy::Amount => a.amount.cmp(&b.amount),
            SortBy::Category => a.category.cmp(&b.category),
            SortBy::Insertion => Ordering::Equal,
        }
    };

    // sort_by is stable, so reversing the comparator keeps ties in insertion order
    match (by, order) {
        (SortBy::Insertion, SortOrder::Ascending) => {}
        (SortBy::Insertion, SortOrder::Descending) => rows.reverse(),
        (_, SortOrder::Ascending) => rows.sort_by(key),
        (_, SortOrder::Descending) => rows.sort_by(|a, b| key(a, b).reverse()),
    }

    rows
}

/// Find the current position of a transaction by id.
pub fn position_of(transactions: &[Transaction], id: TransactionId) -> Option<usize> {
    transactions.iter().position(|t| t.id == id)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Total,
    pub count: usize,
}

/// Totals, balance and per-category breakdown of a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_income: Total,
    pub total_expense: Total,
    /// `total_income - total_expense`, may be negative
    pub balance: Total,
    /// Sorted by total descending, then category name ascending
    pub expense_by_category: Vec<CategoryTotal>,
    /// Same ordering as `expense_by_category`
    pub income_by_category: Vec<CategoryTotal>,
    pub transaction_count: usize,
}

/// Inclusive date bounds; a missing bound is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }
}

/// Aggregate a whole ledger.
pub fn summarize(transactions: &[Transaction]) -> Summary {
    summarize_range(transactions, DateRange::default())
}

/// Aggregate the transactions dated within `range`.
pub fn summarize_range(transactions: &[Transaction], range: DateRange) -> Summary {
    let mut total_income: Total = 0;
    let mut total_expense: Total = 0;
    let mut income: HashMap<&str, CategoryTotal> = HashMap::new();
    let mut expense: HashMap<&str, CategoryTotal> = HashMap::new();
    let mut transaction_count = 0;

    for tx in transactions.iter().filter(|t| range.contains(t.date)) {
        transaction_count += 1;
        let bucket = match tx.kind {
            TransactionKind::Income => {
                total_income += Total::from(tx.amount);
                &mut income
            }
            TransactionKind::Expense => {
                total_expense += Total::from(tx.amount);
                &mut expense
            }
        };
        let entry = bucket
            .entry(tx.category.as_str())
            .or_insert_with(|| CategoryTotal {
                category: tx.category.clone(),
                total: 0,
                count: 0,
            });
        entry.total += Total::from(tx.amount);
        entry.count += 1;
    }

    Summary {
        total_income,
        total_expense,
        balance: total_income - total_expense,
        expense_by_category: ranked(expense),
        income_by_category: ranked(income),
        transaction_count,
    }
}

fn ranked(totals: HashMap<&str, CategoryTotal>) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = totals.into_values().collect();
    totals.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.category.cmp(&b.category))
    });
    totals
}
