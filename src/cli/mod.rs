use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};

use crate::application::{Pocketbook, Session};
use crate::config::Settings;
use crate::domain::{
    format_amount, parse_amount, parse_date, CategoryPolicy, CategoryTotal, DateRange, SortBy,
    SortOrder, Summary, TransactionDraft, DATE_FORMAT,
};
use crate::io::Exporter;
use crate::storage::SqliteStore;

/// Pocketbook - per-user pocket-money ledger
#[derive(Parser)]
#[command(name = "pocketbook")]
#[command(about = "Record dated income and expenses per account and see where the money went")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "POCKETBOOK_DB", global = true)]
    pub database: Option<PathBuf>,

    /// JSON settings file
    #[arg(long, env = "POCKETBOOK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Account identifier (e.g. an email address)
    #[arg(short, long, env = "POCKETBOOK_USER", global = true)]
    pub user: Option<String>,

    /// Account password
    #[arg(short, long, env = "POCKETBOOK_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Accept any category name instead of the recognized set
    #[arg(long, global = true)]
    pub free_categories: bool,

    /// Argon2 memory cost in KiB for new password hashes
    #[arg(long, env = "POCKETBOOK_HASH_MEMORY_KIB", global = true)]
    pub hash_memory_kib: Option<u32>,

    /// Argon2 iteration count for new password hashes
    #[arg(long, env = "POCKETBOOK_HASH_ITERATIONS", global = true)]
    pub hash_iterations: Option<u32>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Create an account
    Signup,

    /// Check credentials
    Login,

    /// Record an income or expense
    Add {
        /// Amount in the smallest currency unit (e.g. "1,500")
        amount: String,

        /// income or expense
        #[arg(short, long, default_value = "expense")]
        kind: String,

        /// Category (see `categories`)
        #[arg(short, long)]
        category: String,

        /// Date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Description
        #[arg(long)]
        description: Option<String>,
    },

    /// Change the transaction at a position (see `list`)
    Edit {
        /// Position as shown by `list`
        position: usize,

        /// New amount
        #[arg(short, long)]
        amount: Option<String>,

        /// New kind: income or expense
        #[arg(short, long)]
        kind: Option<String>,

        /// New category
        #[arg(short, long)]
        category: Option<String>,

        /// New date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,
    },

    /// Delete the transaction at a position (later positions shift down)
    Delete {
        /// Position as shown by `list`
        position: usize,
    },

    /// List transactions
    List {
        /// Sort key: date, amount, category, insertion
        #[arg(short, long, default_value = "date")]
        sort: String,

        /// Order: asc or desc
        #[arg(short, long, default_value = "desc")]
        order: String,

        /// Maximum number of transactions to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show totals, balance, and income and spending per category
    Summary {
        /// From date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// To date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Show the accepted categories
    Categories,

    /// Export the ledger
    Export {
        /// Format: csv, json
        format: String,

        /// Output file (stdout if omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    /// Settings from the optional file, overridden by flags and environment.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::from_file(path)?,
            None => Settings::default(),
        };
        if let Some(database) = &self.database {
            settings.database = database.clone();
        }
        if self.free_categories {
            settings.categories = CategoryPolicy::FreeText;
        }
        if let Some(memory_kib) = self.hash_memory_kib {
            settings.hashing.memory_kib = memory_kib;
        }
        if let Some(iterations) = self.hash_iterations {
            settings.hashing.iterations = iterations;
        }
        Ok(settings)
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        let Some(user) = self.user.as_deref() else {
            bail!("Missing account: pass --user or set POCKETBOOK_USER");
        };
        let Some(password) = self.password.as_deref() else {
            bail!("Missing password: pass --password or set POCKETBOOK_PASSWORD");
        };
        Ok((user, password))
    }

    pub async fn run(self) -> Result<()> {
        let settings = self.settings()?;
        let book = Pocketbook::open(&settings).await?;

        match &self.command {
            Commands::Init => {
                println!("Initialized database: {}", settings.database.display());
            }

            Commands::Signup => {
                let (user, password) = self.credentials()?;
                let created = book.signup(user, password).await?;
                println!("Created account: {}", created.identifier);
            }

            Commands::Login => {
                let (user, password) = self.credentials()?;
                let session = book.login(user, password).await?;
                println!(
                    "Logged in as {} ({} transactions)",
                    session.identifier(),
                    session.len()
                );
                book.logout(session);
            }

            command => {
                let (user, password) = self.credentials()?;
                let mut session = book.login(user, password).await?;
                let result = run_ledger_command(&book, &mut session, command).await;
                book.logout(session);
                result?;
            }
        }

        Ok(())
    }
}

async fn run_ledger_command(
    book: &Pocketbook<SqliteStore>,
    session: &mut Session,
    command: &Commands,
) -> Result<()> {
    let ledger = book.ledger();

    match command {
        Commands::Add {
            amount,
            kind,
            category,
            date,
            description,
        } => {
            let amount =
                parse_amount(amount).context("Invalid amount. Use e.g. '1500' or '1,500'")?;
            let date = date.clone().unwrap_or_else(today);
            let draft = TransactionDraft::new(date, kind.as_str(), category.as_str(), amount)
                .with_description(description.clone().unwrap_or_default());

            let len = ledger.add(session, &draft).await?;
            let position = len - 1;
            if let Some(tx) = session.get(position) {
                println!(
                    "Recorded {} {} ({}) at position {}",
                    tx.kind,
                    format_amount(tx.amount),
                    tx.category,
                    position
                );
            }
        }

        Commands::Edit {
            position,
            amount,
            kind,
            category,
            date,
            description,
        } => {
            let Some(existing) = session.get(*position) else {
                bail!(
                    "Position {} is out of range for a ledger of {} transactions",
                    position,
                    session.len()
                );
            };

            let mut draft = TransactionDraft::from(existing);
            if let Some(amount) = amount {
                draft.amount = parse_amount(amount).context("Invalid amount")?;
            }
            if let Some(kind) = kind {
                draft.kind = kind.clone();
            }
            if let Some(category) = category {
                draft.category = category.clone();
            }
            if let Some(date) = date {
                draft.date = date.clone();
            }
            if let Some(description) = description {
                draft.description = description.clone();
            }

            let updated = ledger.edit(session, *position, &draft).await?;
            println!(
                "Updated position {}: {} {} {} ({})",
                position,
                updated.date_string(),
                updated.kind,
                format_amount(updated.amount),
                updated.category
            );
        }

        Commands::Delete { position } => {
            let removed = ledger.delete(session, *position).await?;
            println!(
                "Deleted {} {} {} ({})",
                removed.date_string(),
                removed.kind,
                format_amount(removed.amount),
                removed.category
            );
        }

        Commands::List { sort, order, limit } => {
            let by = SortBy::from_str(sort)
                .with_context(|| format!("Unknown sort key '{}'", sort))?;
            let order = SortOrder::from_str(order)
                .with_context(|| format!("Unknown order '{}'", order))?;
            let rows = ledger.list(session, by, order);

            if rows.is_empty() {
                println!("No transactions yet.");
            } else {
                println!(
                    "{:>4} {:<12} {:<8} {:>12} {:<14} DESCRIPTION",
                    "#", "DATE", "KIND", "AMOUNT", "CATEGORY"
                );
                println!("{}", "-".repeat(70));
                for row in rows.iter().take(limit.unwrap_or(usize::MAX)) {
                    let tx = &row.transaction;
                    println!(
                        "{:>4} {:<12} {:<8} {:>12} {:<14} {}",
                        row.position,
                        tx.date_string(),
                        tx.kind.as_str(),
                        format_amount(tx.amount),
                        truncate(&tx.category, 14),
                        truncate(&tx.description, 30)
                    );
                }
            }
        }

        Commands::Summary { from, to } => {
            let range = DateRange {
                from: from.as_deref().map(parse_date).transpose()?,
                to: to.as_deref().map(parse_date).transpose()?,
            };
            print_summary(&ledger.aggregate_between(session, range));
        }

        Commands::Categories => match ledger.categories().names() {
            Some(names) => {
                for name in names {
                    println!("{}", name);
                }
            }
            None => println!("Any non-empty category name is accepted."),
        },

        Commands::Export { format, output } => {
            let exporter = Exporter::new(session);
            let writer: Box<dyn std::io::Write> = match output {
                Some(path) => Box::new(
                    std::fs::File::create(path)
                        .with_context(|| format!("Failed to create {}", path.display()))?,
                ),
                None => Box::new(std::io::stdout()),
            };

            match format.as_str() {
                "csv" => {
                    let count = exporter.export_csv(writer)?;
                    if output.is_some() {
                        println!("Exported {} transactions", count);
                    }
                }
                "json" => {
                    let export = exporter.export_json(writer)?;
                    if output.is_some() {
                        println!("Exported {} transactions", export.transactions.len());
                    }
                }
                other => bail!("Unknown export format '{}'. Use csv or json", other),
            }
        }

        Commands::Init | Commands::Signup | Commands::Login => {}
    }

    Ok(())
}

fn print_summary(summary: &Summary) {
    println!("Income:   {:>14}", format_amount(summary.total_income));
    println!("Expense:  {:>14}", format_amount(summary.total_expense));
    println!("Balance:  {:>14}", format_amount(summary.balance));

    print_breakdown("EARNED", &summary.income_by_category);
    print_breakdown("SPENT", &summary.expense_by_category);
}

fn print_breakdown(heading: &str, totals: &[CategoryTotal]) {
    if totals.is_empty() {
        return;
    }
    println!();
    println!("{:<16} {:>12} {:>6}", "CATEGORY", heading, "COUNT");
    println!("{}", "-".repeat(36));
    for entry in totals {
        println!(
            "{:<16} {:>12} {:>6}",
            truncate(&entry.category, 16),
            format_amount(entry.total),
            entry.count
        );
    }
}

fn today() -> String {
    Local::now().date_naive().format(DATE_FORMAT).to_string()
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("용돈기입장테스트", 6), "용돈기...");
    }

    #[test]
    fn test_settings_from_flags() {
        let cli = Cli::parse_from([
            "pocketbook",
            "--database",
            "/tmp/x.db",
            "--free-categories",
            "--hash-memory-kib",
            "64",
            "list",
        ]);
        let settings = cli.settings().unwrap();

        assert_eq!(settings.database, PathBuf::from("/tmp/x.db"));
        assert_eq!(settings.categories, CategoryPolicy::FreeText);
        assert_eq!(settings.hashing.memory_kib, 64);
    }

    #[test]
    fn test_credentials_required() {
        let cli = Cli::parse_from(["pocketbook", "--user", "mina", "summary"]);
        assert!(cli.credentials().is_err());
    }
}
