//! CLI tool for converting bank transaction exports into OFX statements.
//!
//! # Usage
//!
//! ```bash
//! # Auto-detect everything, write statement.ofx next to the input
//! file2ofx statement.csv --fi-id 123456789 --account-id 000111222
//!
//! # OFX 2.2 with balances, settings from a config file
//! file2ofx export.txt --config bank.json --ofx-version 220 --ledger-balance 1520.33
//!
//! # Explicit columns, fail with exit code 2 if any row is skipped
//! file2ofx data.txt --date-column 0 --amount-column 3 --strict -vv
//! ```

mod config;
mod output;

use std::{
    path::{Path, PathBuf},
    process,
};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::{ArgAction, Parser, ValueEnum};
use file2ofx_core::{
    fields::{parse_amount, parse_date},
    mapping::parse_column_names,
    prelude::*,
};
use rust_decimal::Decimal;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::{config::FileConfig, output::default_output};

/// Exit code for a run that succeeded with skipped rows under `--strict`.
const EXIT_STRICT: i32 = 2;

/// Convert a CSV or text transaction file into an OFX statement.
///
/// Column roles (date, amount, description, type) are detected from the
/// header and the data unless a `.cols` file or explicit column flags are
/// given. Warnings go to stderr.
#[derive(Parser, Debug)]
#[command(name = "file2ofx")]
#[command(version, about)]
struct Args {
    /// Input file (CSV or TXT).
    input: PathBuf,

    /// Input format.
    #[arg(short, long, value_enum, default_value_t = FormatArg::Auto)]
    format: FormatArg,

    /// Input encoding label (default: detected).
    #[arg(short, long)]
    encoding: Option<String>,

    /// Output file (default: input name with .ofx extension).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace). RUST_LOG wins.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// OFX version: 102, 103, 151, 160, 200, 201, 202, 203, 210, 211 or 220.
    #[arg(long)]
    ofx_version: Option<String>,

    /// Financial institution name.
    #[arg(long)]
    fi_org: Option<String>,

    /// Financial institution id.
    #[arg(long)]
    fi_id: Option<String>,

    /// Account number.
    #[arg(long)]
    account_id: Option<String>,

    /// Account type.
    #[arg(long, value_enum)]
    account_type: Option<AccountTypeArg>,

    /// Currency code (default: USD).
    #[arg(long)]
    currency: Option<String>,

    /// Closing ledger balance.
    #[arg(long, value_parser = parse_balance, allow_hyphen_values = true)]
    ledger_balance: Option<Decimal>,

    /// Closing available balance.
    #[arg(long, value_parser = parse_balance, allow_hyphen_values = true)]
    available_balance: Option<Decimal>,

    /// As-of date for the balances (default: generation time).
    #[arg(long, value_parser = parse_balance_date)]
    balance_date: Option<NaiveDateTime>,

    /// Column names in order, comma-separated; skips detection.
    #[arg(long)]
    columns: Option<String>,

    /// Zero-based date column.
    #[arg(long)]
    date_column: Option<usize>,

    /// Zero-based amount column.
    #[arg(long)]
    amount_column: Option<usize>,

    /// Zero-based debit (outflow) column; pairs with --credit-column.
    #[arg(long)]
    debit_column: Option<usize>,

    /// Zero-based credit (inflow) column; pairs with --debit-column.
    #[arg(long)]
    credit_column: Option<usize>,

    /// Zero-based description column.
    #[arg(long)]
    description_column: Option<usize>,

    /// Zero-based type column.
    #[arg(long)]
    type_column: Option<usize>,

    /// Largest share of rows that may be skipped (default: 0.25).
    #[arg(long)]
    max_invalid_ratio: Option<f64>,

    /// JSON config file with institution defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Exit with code 2 when any row was skipped.
    #[arg(long)]
    strict: bool,
}

/// Input formats for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    /// Decide from the file extension.
    Auto,
    /// Delimited text.
    Csv,
    /// Delimited or fixed-width text.
    Txt,
}

impl From<FormatArg> for InputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Auto => InputFormat::Auto,
            FormatArg::Csv => InputFormat::Csv,
            FormatArg::Txt => InputFormat::Txt,
        }
    }
}

/// Account types for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum AccountTypeArg {
    Checking,
    Savings,
    Moneymrkt,
    Creditline,
}

impl From<AccountTypeArg> for AccountType {
    fn from(arg: AccountTypeArg) -> Self {
        match arg {
            AccountTypeArg::Checking => AccountType::Checking,
            AccountTypeArg::Savings => AccountType::Savings,
            AccountTypeArg::Moneymrkt => AccountType::MoneyMarket,
            AccountTypeArg::Creditline => AccountType::CreditLine,
        }
    }
}

fn parse_balance(s: &str) -> Result<Decimal, String> {
    parse_amount(s).map_err(|e| e.to_string())
}

fn parse_balance_date(s: &str) -> Result<NaiveDateTime, String> {
    parse_date(s).map_err(|e| e.to_string())
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(0) => {}
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(exit_code(&e));
        }
    }
}

/// Installs the stderr subscriber; `RUST_LOG` overrides `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn run(args: &Args) -> Result<i32> {
    let file_config = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let output = match &args.output {
        Some(path) => path.clone(),
        None => default_output(&args.input)?,
    };
    let options = build_options(args, file_config, output)?;
    debug!(?options, "resolved options");

    let conversion = convert(&args.input, &options)
        .with_context(|| format!("Failed to convert {}", args.input.display()))?;

    for diagnostic in &conversion.diagnostics {
        eprintln!("warning: {diagnostic}");
    }
    let written = conversion.output.as_deref().unwrap_or(Path::new("-"));
    info!(output = %written.display(), "done");
    eprintln!(
        "Converted {} transaction(s) from {} to {}",
        conversion.transactions.len(),
        args.input.display(),
        written.display()
    );

    let skipped = conversion.skipped_rows().count();
    if args.strict && skipped > 0 {
        eprintln!("Error: {skipped} row(s) skipped (--strict)");
        return Ok(EXIT_STRICT);
    }
    Ok(0)
}

/// Merges flags over the config file.
fn build_options(args: &Args, file: FileConfig, output: PathBuf) -> Result<ConvertOptions> {
    let section = file.institution;
    let institution = InstitutionConfig {
        org: args.fi_org.clone().or(section.org),
        fi_id: args.fi_id.clone().or(section.fi_id).unwrap_or_default(),
        account_id: args.account_id.clone().or(section.account_id).unwrap_or_default(),
        account_type: args
            .account_type
            .map(AccountType::from)
            .or(section.account_type)
            .unwrap_or_default(),
        currency: args
            .currency
            .clone()
            .or(section.currency)
            .unwrap_or_else(|| InstitutionConfig::default().currency),
    };

    let mut options = ConvertOptions::default()
        .with_format(args.format.into())
        .with_output(output)
        .with_institution(institution);

    if let Some(version) = args.ofx_version.clone().or(file.ofx_version) {
        options = options.with_version(version);
    }
    if let Some(encoding) = args.encoding.clone().or(file.encoding) {
        options = options.with_encoding(encoding);
    }
    if let Some(ratio) = args.max_invalid_ratio.or(file.max_invalid_ratio) {
        options = options.with_max_invalid_ratio(ratio);
    }

    let balance = BalanceInfo {
        ledger: args.ledger_balance.map(|amount| Balance { amount, as_of: args.balance_date }),
        available: args
            .available_balance
            .map(|amount| Balance { amount, as_of: args.balance_date }),
    };
    if !balance.is_empty() {
        options = options.with_balance(balance);
    }

    if let Some(columns) = &args.columns {
        let names = parse_column_names(columns)
            .map_err(|reason| anyhow::anyhow!("Invalid --columns: {reason}"))?;
        options = options.with_columns(names);
    }

    let indices: Vec<(Role, usize)> = [
        (Role::Date, args.date_column),
        (Role::Debit, args.debit_column),
        (Role::Credit, args.credit_column),
        (Role::Amount, args.amount_column),
        (Role::Description, args.description_column),
        (Role::Type, args.type_column),
    ]
    .into_iter()
    .filter_map(|(role, column)| column.map(|c| (role, c)))
    .collect();
    if !indices.is_empty() {
        options = options.with_column_indices(RoleAssignment::from_indices(indices)?);
    }

    Ok(options)
}

/// Maps a failure to the documented exit code.
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ConvertError>() {
        Some(ConvertError::UnresolvedFormat { .. }) => 3,
        Some(ConvertError::ColumnDetectionFailed { .. }) => 4,
        Some(ConvertError::TooManyInvalidRows { .. }) => 5,
        Some(ConvertError::UnsupportedVersion { .. }) => 6,
        Some(ConvertError::OutputWriteFailed { .. }) => 7,
        Some(ConvertError::NoTransactions | ConvertError::MissingField { .. }) => 8,
        _ => 1,
    }
}
