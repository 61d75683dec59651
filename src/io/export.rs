use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::Session;
use crate::domain::Transaction;

/// One account's ledger as written by a JSON export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerExport {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub account: String,
    pub transactions: Vec<Transaction>,
}

/// Writes a session's ledger in insertion order.
pub struct Exporter<'a> {
    session: &'a Session,
}

impl<'a> Exporter<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Export transactions to CSV format. Returns the number of rows written.
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "position",
            "id",
            "date",
            "kind",
            "category",
            "description",
            "amount",
        ])?;

        let mut count = 0;
        for (position, tx) in self.session.transactions().iter().enumerate() {
            csv_writer.write_record([
                position.to_string(),
                tx.id.to_string(),
                tx.date_string(),
                tx.kind.as_str().to_string(),
                tx.category.clone(),
                tx.description.clone(),
                tx.amount.to_string(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the ledger as a pretty-printed JSON document.
    pub fn export_json<W: Write>(&self, mut writer: W) -> Result<LedgerExport> {
        let export = LedgerExport {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            account: self.session.identifier().to_string(),
            transactions: self.session.transactions().to_vec(),
        };

        let json = serde_json::to_string_pretty(&export)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(export)
    }
}
