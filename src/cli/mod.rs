pub mod auth;
pub mod categories;
pub mod export;
pub mod import;
pub mod init;
pub mod logs;
pub mod report;
pub mod tx;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use crate::db::SqliteStore;
use crate::error::{LedgerError, Result};
use crate::filter::Filter;
use crate::ledger::Ledger;
use crate::session::Session;
use crate::settings::{config_dir, load_settings, Settings};

/// Load settings, check for a signed-in session and open the ledger.
pub(crate) fn open_ledger() -> Result<(Settings, Ledger<SqliteStore>)> {
    let settings = load_settings();
    let session = Session::load(&config_dir(), settings.credentials.as_ref());
    let user = session.require()?;
    log::debug!("opening ledger for {user}");

    let db_path = settings.db_path();
    if !db_path.exists() {
        return Err(LedgerError::Settings(
            "Database not found. Run `smart-ledger init` to set up.".to_string(),
        ));
    }
    let ledger = Ledger::open(SqliteStore::open(&db_path)?)?;
    Ok((settings, ledger))
}

pub(crate) fn parse_date_arg(raw: &str) -> Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| LedgerError::Validation(format!("date must be YYYY-MM-DD, got '{raw}'")))
}

#[derive(Parser)]
#[command(
    name = "smart-ledger",
    version,
    about = "Personal income and expense ledger with spreadsheet import."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PeriodArgs {
    /// Year: YYYY (default: current year)
    #[arg(long)]
    pub year: Option<i32>,
    /// Month 1-12 or name, quarter q1-q4, or `all` (default: current month)
    #[arg(long)]
    pub month: Option<String>,
}

impl PeriodArgs {
    pub fn filter(&self) -> Result<Filter> {
        let mut filter = Filter::default();
        if let Some(year) = self.year {
            filter.year = year;
        }
        if let Some(month) = &self.month {
            filter.period = month.parse()?;
        }
        Ok(filter)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the account and initialize the database.
    Init {
        /// Path for ledger data (default: ~/Documents/smart-ledger)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        /// Read the password from the first line of stdin
        #[arg(long = "password-stdin")]
        password_stdin: bool,
    },
    /// Sign in.
    Login {
        username: String,
        /// Read the password from the first line of stdin
        #[arg(long = "password-stdin")]
        password_stdin: bool,
    },
    /// Sign out.
    Logout,
    /// Change the password of the signed-in account.
    Passwd {
        /// Read current and new password from the first two lines of stdin
        #[arg(long = "password-stdin")]
        password_stdin: bool,
    },
    /// Reset a forgotten password with a one-time PIN.
    ResetPassword,
    /// Manage transactions.
    Tx {
        #[command(subcommand)]
        command: TxCommands,
    },
    /// Manage categories.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Import transactions from a CSV or spreadsheet file.
    Import {
        /// Path to CSV or XLSX file to import
        file: String,
    },
    /// Write a sample import file.
    Template {
        /// Output path (default: ./import_template.csv)
        #[arg(long)]
        output: Option<String>,
    },
    /// Export transactions for a period.
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },
    /// Totals, balance and category breakdown for a period.
    Summary {
        #[command(flatten)]
        period: PeriodArgs,
    },
    /// Monthly income/expense bars for the year and the category split.
    Charts {
        #[command(flatten)]
        period: PeriodArgs,
    },
    /// Show recent activity.
    Logs {
        /// Number of entries (default: log_window from settings)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print shell completions.
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Record a transaction.
    Add {
        amount: f64,
        /// income or expense
        #[arg(long = "type")]
        kind: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        details: String,
        #[arg(long = "sub-category")]
        sub_category: Option<String>,
        /// YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Edit a transaction.
    Edit {
        /// Transaction ID (shown in `smart-ledger tx list`)
        id: i64,
        #[arg(long)]
        amount: Option<f64>,
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        details: Option<String>,
        #[arg(long = "sub-category", conflicts_with = "clear_sub_category")]
        sub_category: Option<String>,
        #[arg(long = "clear-sub-category")]
        clear_sub_category: bool,
        #[arg(long)]
        date: Option<String>,
    },
    /// Delete a transaction.
    Delete {
        id: i64,
    },
    /// List transactions for a period.
    List {
        #[command(flatten)]
        period: PeriodArgs,
    },
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// Add a category.
    Add {
        name: String,
        /// income or expense
        #[arg(long = "type")]
        kind: String,
        #[arg(long = "sub-category")]
        sub_category: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Edit a category.
    Edit {
        /// Category ID (shown in `smart-ledger categories list`)
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long = "sub-category")]
        sub_category: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete a category. Transactions keep their category name.
    Delete {
        id: i64,
    },
    /// List categories.
    List,
}

#[derive(Subcommand)]
pub enum ExportCommands {
    /// Export transactions to CSV.
    Csv {
        #[command(flatten)]
        period: PeriodArgs,
        /// Document title, also used in the default file name
        #[arg(long, default_value = "Transactions")]
        title: String,
        #[arg(long)]
        output: Option<String>,
    },
    /// Export transactions to PDF.
    #[cfg(feature = "pdf")]
    Pdf {
        #[command(flatten)]
        period: PeriodArgs,
        #[arg(long, default_value = "Transactions")]
        title: String,
        #[arg(long)]
        output: Option<String>,
    },
}
