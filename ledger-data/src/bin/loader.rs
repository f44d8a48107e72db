use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ledger_data::TaxSettingsLoader;
use ledger_db_sqlite::SqliteRepository;
use tracing_subscriber::EnvFilter;

/// Load per-class tax rate overrides from a CSV file into the database.
///
/// The CSV file has a `class_code` column followed by any of the rate
/// columns (a fraction, e.g. 0.1 for 10%). Empty cells keep the default:
/// - stock_transaction_rate, real_estate_transaction_rate, item_store_vat
/// - auction_transaction_rate, property_holding_tax_rate
/// - item_market_transaction_rate, income_tax_rate, transaction_tax_rate
/// - salary_tax_rate, reward_tax_rate
///
/// Every listed class also gets an empty treasury if it has none yet.
#[derive(Parser, Debug)]
#[command(name = "ledger-settings-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the CSV file containing class tax settings
    #[arg(short, long)]
    file: PathBuf,

    /// SQLite database path or URL (created if missing)
    #[arg(short, long, default_value = "ledger.db")]
    database: String,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let repo = SqliteRepository::new(&args.database)
        .await
        .with_context(|| format!("Failed to connect to database: {}", args.database))?;

    if args.migrate {
        println!("Running migrations...");
        repo.run_migrations()
            .await
            .context("Failed to run migrations")?;
        println!("Migrations complete.");
    }

    println!("Loading class tax settings from: {}", args.file.display());

    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open: {}", args.file.display()))?;

    let records = TaxSettingsLoader::parse(file)
        .with_context(|| format!("Failed to parse CSV: {}", args.file.display()))?;

    println!("Parsed {} records from CSV", records.len());

    let written = TaxSettingsLoader::load(&repo, &records)
        .await
        .context("Failed to load tax settings into database")?;

    println!("Successfully loaded tax settings for {} classes.", written);

    Ok(())
}
