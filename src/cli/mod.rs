pub mod backup;
pub mod customer;
pub mod import;
pub mod init;
pub mod load;
pub mod outcome;
pub mod profiles;
pub mod status;
pub mod summary;
pub mod transfer;
pub mod tx;

use clap::{Parser, Subcommand};
use colored::Colorize;
use comfy_table::{Cell, CellAlignment};
use rusqlite::Connection;

use crate::currency::{Amounts, Currency};
use crate::db::{get_connection, RetryPolicy};
use crate::error::{KasaError, Result};
use crate::fmt::amount_or_blank;
use crate::importer::parse_date;
use crate::settings::{load_settings, Settings};

/// Settings plus an open connection for the duration of one command.
pub(crate) struct Session {
    pub settings: Settings,
    pub conn: Connection,
}

impl Session {
    pub fn open() -> Result<Self> {
        let settings = load_settings();
        let db_path = settings.db_path();
        if !db_path.exists() {
            return Err(KasaError::Settings(format!(
                "No database at {}. Run `kasa init` first.",
                db_path.display()
            )));
        }
        let conn = get_connection(&db_path)?;
        Ok(Self { settings, conn })
    }

    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.settings.retry_attempts,
            delay: self.settings.retry_delay(),
        }
    }
}

/// A `--month YYYY-MM` argument. Anything else is an error rather than "all months".
pub(crate) fn month_arg(month: &Option<String>) -> Result<Option<(i32, u32)>> {
    let Some(raw) = month else { return Ok(None) };
    let parsed = raw
        .trim()
        .split_once('-')
        .and_then(|(y, m)| Some((y.parse::<i32>().ok()?, m.parse::<u32>().ok()?)))
        .filter(|(_, m)| (1..=12).contains(m));
    match parsed {
        Some(ym) => Ok(Some(ym)),
        None => Err(KasaError::Other(format!("Month must look like YYYY-MM, got '{raw}'"))),
    }
}

/// Date prefix for `--month` or `--year`; the month wins when both are given.
pub(crate) fn period_arg(month: &Option<String>, year: Option<i32>) -> Result<Option<String>> {
    Ok(match (month_arg(month)?, year) {
        (Some((y, m)), _) => Some(format!("{y:04}-{m:02}")),
        (None, Some(y)) => Some(format!("{y:04}")),
        (None, None) => None,
    })
}

/// A date argument in `dd.mm.YYYY` or `YYYY-MM-DD`, normalized to ISO.
pub(crate) fn date_arg(raw: &str) -> Result<String> {
    parse_date(raw).ok_or_else(|| KasaError::InvalidDate(raw.to_string()))
}

pub(crate) fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

pub(crate) fn currency_headers() -> Vec<&'static str> {
    Currency::ALL.iter().map(|c| c.header()).collect()
}

pub(crate) fn amount_cells(amounts: &Amounts) -> Vec<Cell> {
    Currency::ALL
        .iter()
        .map(|c| {
            let v = amounts.get(*c);
            let text = amount_or_blank(v);
            let text = if v < 0.0 { text.red().to_string() } else { text };
            Cell::new(text).set_alignment(CellAlignment::Right)
        })
        .collect()
}

#[derive(Parser)]
#[command(name = "kasa", about = "Ledger for a small freight business: transactions, outcomes, transfers, customers.")]
pub struct Cli {
    /// More log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for kasa data (default: ~/Documents/kasa)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Switch to an existing kasa data directory.
    Load {
        /// Path to data directory containing kasa.db
        path: String,
    },
    /// Show current database and summary statistics.
    Status,
    /// Back up the database.
    Backup {
        /// Output path (default: <data_dir>/backups/kasa-YYYYMMDD-HHMMSS.db)
        #[arg(long)]
        output: Option<String>,
    },
    /// Import an XLSX/CSV sheet.
    Import {
        /// Path to the spreadsheet
        file: String,
        /// Sheet kind: transactions, outcomes, customers, transfers
        #[arg(long, default_value = "transactions")]
        kind: String,
    },
    /// Add, edit, delete and list ledger transactions.
    Tx {
        #[command(subcommand)]
        command: TxCommands,
    },
    /// Profile balances.
    Profiles {
        #[command(subcommand)]
        command: ProfilesCommands,
    },
    /// Per-vehicle expense records.
    Outcome {
        #[command(subcommand)]
        command: OutcomeCommands,
    },
    /// Money moved to or from counterparts.
    Transfer {
        #[command(subcommand)]
        command: TransferCommands,
    },
    /// Customer contacts.
    Customer {
        #[command(subcommand)]
        command: CustomerCommands,
    },
    /// Monthly and yearly sums per profile.
    Summary {
        #[command(subcommand)]
        command: SummaryCommands,
    },
}

#[derive(clap::Args)]
pub struct TxFields {
    /// Date: dd.mm.YYYY or YYYY-MM-DD
    #[arg(long)]
    pub date: String,
    /// Profile (account) name
    #[arg(long)]
    pub name: String,
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub dolar: f64,
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub euro: f64,
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub zl: f64,
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub tl: f64,
    /// Vehicle plate
    #[arg(long)]
    pub vehicle: Option<String>,
    /// Container number
    #[arg(long)]
    pub container: Option<String>,
    /// Agreed freight price
    #[arg(long)]
    pub price: Option<f64>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Record a transaction and update the profile balance.
    Add(TxFields),
    /// Replace a transaction; balances move with it.
    Edit {
        /// Transaction ID (shown in `kasa tx list`)
        id: i64,
        #[command(flatten)]
        fields: TxFields,
    },
    /// Reverse and remove a transaction.
    Delete {
        /// Transaction ID (shown in `kasa tx list`)
        id: i64,
    },
    /// List transactions for a day (default today) or all dates.
    List {
        /// Profile name (default: all profiles)
        #[arg(long)]
        profile: Option<String>,
        /// Day to show: dd.mm.YYYY or YYYY-MM-DD
        #[arg(long, conflicts_with = "all_dates")]
        date: Option<String>,
        /// Show every date
        #[arg(long = "all-dates")]
        all_dates: bool,
    },
}

#[derive(Subcommand)]
pub enum ProfilesCommands {
    /// List profiles with their running balances.
    List,
    /// One profile's balance and its latest transactions.
    Show {
        name: String,
    },
    /// Check balances against transaction sums.
    Verify,
    /// Rebuild balances from transaction sums.
    Recompute,
}

#[derive(Subcommand)]
pub enum OutcomeCommands {
    /// Record an expense broken into categories.
    Add {
        /// Date: dd.mm.YYYY or YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// Vehicle plate
        #[arg(long)]
        vehicle: String,
        /// Category and tagged value, e.g. --item "Yakıt=150Y" (repeatable)
        #[arg(long = "item", value_name = "CATEGORY=VALUE")]
        items: Vec<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List outcomes with their categories.
    List {
        /// Month (YYYY-MM)
        #[arg(long)]
        month: Option<String>,
        /// Year (YYYY)
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        vehicle: Option<String>,
    },
    /// Reverse and remove an outcome.
    Delete {
        /// Outcome ID (shown in `kasa outcome list`)
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum TransferCommands {
    /// Record a transfer.
    Add {
        /// Date: dd.mm.YYYY or YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// Counterpart name
        #[arg(long)]
        counterpart: String,
        /// in or out
        #[arg(long, default_value = "in")]
        direction: String,
        #[arg(long)]
        amount: f64,
        /// dolar, euro, zl or tl
        #[arg(long)]
        currency: String,
        #[arg(long, default_value = "0")]
        commission: f64,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List transfers.
    List {
        /// Month (YYYY-MM)
        #[arg(long)]
        month: Option<String>,
        #[arg(long)]
        counterpart: Option<String>,
    },
    /// Net amount and commission per counterpart.
    Totals {
        /// Month (YYYY-MM)
        #[arg(long)]
        month: Option<String>,
        /// Year (YYYY)
        #[arg(long)]
        year: Option<i32>,
    },
    /// Remove a transfer.
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum CustomerCommands {
    /// Add or replace a customer by numeric ID.
    Add {
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List customers.
    List {
        /// Match name, phone or email
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one customer.
    Show {
        id: i64,
    },
    /// Remove a customer.
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum SummaryCommands {
    /// Sums per profile for one month.
    Month {
        /// Month (YYYY-MM, default: current month)
        #[arg(long)]
        month: Option<String>,
        /// Profile name (default: all profiles)
        #[arg(long)]
        profile: Option<String>,
    },
    /// Sums per profile for one year.
    Year {
        /// Year (default: current year)
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        profile: Option<String>,
    },
    /// Outcome costs per vehicle.
    Vehicles {
        /// Month (YYYY-MM)
        #[arg(long)]
        month: Option<String>,
        /// Year (default: current year)
        #[arg(long)]
        year: Option<i32>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_month_arg() {
        assert_eq!(month_arg(&Some("2024-03".into())).unwrap(), Some((2024, 3)));
        assert_eq!(month_arg(&None).unwrap(), None);
        for bad in ["March", "2024/03", "2024-13", "2024-"] {
            assert!(month_arg(&Some(bad.into())).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_period_arg() {
        assert_eq!(period_arg(&Some("2024-03".into()), Some(2020)).unwrap().as_deref(), Some("2024-03"));
        assert_eq!(period_arg(&None, Some(2024)).unwrap().as_deref(), Some("2024"));
        assert_eq!(period_arg(&None, None).unwrap(), None);
        assert!(period_arg(&Some("2024/03".into()), None).is_err());
    }

    #[test]
    fn test_date_arg() {
        assert_eq!(date_arg("05.03.2024").unwrap(), "2024-03-05");
        assert!(date_arg("5th of March").is_err());
    }

    #[test]
    fn test_negative_amount_flag() {
        let cli = Cli::try_parse_from([
            "kasa", "tx", "add", "--date", "2024-03-05", "--name", "Ali", "--dolar", "-20",
        ])
        .unwrap();
        match cli.command {
            Commands::Tx { command: TxCommands::Add(fields) } => assert_eq!(fields.dolar, -20.0),
            _ => panic!("expected tx add"),
        }
    }
}
