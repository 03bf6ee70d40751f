//! Command-line argument definitions.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use lifesync_core::schema::parse_calendar_date;
use lifesync_core::{Priority, TransactionType};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "lifesync",
    version,
    about = "Local tasks, ledger and notes engine."
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// JSON config file (defaults + LIFESYNC_* environment otherwise)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// SQLite database holding the state document
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
    /// Storage key of the state document
    #[arg(long, global = true)]
    pub key: Option<String>,
    /// Absolute directory for rolling log files
    #[arg(long = "log-dir", global = true)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check core linkage.
    Ping,
    /// Write a pretty JSON backup of the full state.
    Export {
        /// Output file (default: stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace the full state from a backup file.
    Import {
        /// Backup file produced by `export`
        file: PathBuf,
    },
    /// Delete all tasks, transactions and notes.
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
    /// List tasks for a day (or the week starting at that day).
    Agenda {
        /// Day: YYYY-MM-DD (default: today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        /// Include the 7 days starting at --date
        #[arg(long)]
        week: bool,
    },
    /// Show counts, today's progress and ledger totals.
    Summary,
    /// Manage tasks.
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Manage ledger transactions.
    Tx {
        #[command(subcommand)]
        command: TxCommands,
    },
    /// Manage notes.
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Add a task.
    Add {
        title: String,
        /// Anchor day: YYYY-MM-DD (default: today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        /// Weekly on these days, 0 = Sunday, e.g. --weekly 1,3,5
        #[arg(long, value_delimiter = ',', value_parser = clap::value_parser!(u8).range(0..=6))]
        weekly: Vec<u8>,
        #[arg(long, value_enum, default_value_t = PriorityArg::Medium)]
        priority: PriorityArg,
        #[arg(long)]
        description: Option<String>,
    },
    /// Toggle completion for a day.
    Toggle {
        id: String,
        /// Day: YYYY-MM-DD (default: today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
    /// Delete a task.
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Record income or expense.
    Add {
        #[arg(value_enum)]
        kind: KindArg,
        amount: f64,
        /// Day: YYYY-MM-DD (default: today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Delete a transaction.
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum NoteCommands {
    /// Add a note.
    Add {
        title: String,
        #[arg(long, default_value = "")]
        content: String,
        #[arg(long)]
        pinned: bool,
    },
    /// Pin (or with --off, unpin) a note.
    Pin {
        id: String,
        #[arg(long)]
        off: bool,
    },
    /// Delete a note.
    Delete { id: String },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PriorityArg {
    High,
    Medium,
    Low,
}

impl From<PriorityArg> for Priority {
    fn from(value: PriorityArg) -> Self {
        match value {
            PriorityArg::High => Priority::High,
            PriorityArg::Medium => Priority::Medium,
            PriorityArg::Low => Priority::Low,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    Income,
    Expense,
}

impl From<KindArg> for TransactionType {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Income => TransactionType::Income,
            KindArg::Expense => TransactionType::Expense,
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    parse_calendar_date(value).ok_or_else(|| format!("expected YYYY-MM-DD, got `{value}`"))
}
