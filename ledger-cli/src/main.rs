use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::debug;

use ledger_cli::app::{self, ChargeKind, ChargeRequest};
use ledger_cli::config::LedgerConfig;
use ledger_cli::logging;
use ledger_core::{LedgerRepository, TaxCalculator};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Tax and treasury ledger for a classroom economy.
///
/// Connects to the configured ledger store, runs one command and prints
/// the result. Logs go to stderr.
#[derive(Debug, Parser)]
#[command(name = "treasury-ledger", version)]
struct Cli {
    /// Config file. Defaults to `ledger.toml` when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Database backend to use (`sqlite` or `memory`).
    #[arg(long)]
    backend: Option<String>,

    /// Database connection string.
    /// For SQLite this is a file path (e.g. `ledger.db`) or `:memory:`.
    #[arg(long)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a class treasury.
    Open { class_code: String },

    /// Print the effective tax rates of a class.
    Rates { class_code: String },

    /// Tax one amount and post it to the class treasury.
    Charge {
        kind: ChargeKind,

        #[arg(long = "class")]
        class_code: String,

        #[arg(long = "user")]
        user_id: String,

        #[arg(long, value_parser = clap::value_parser!(i64).range(0..))]
        amount: i64,

        /// Item sale between users instead of a store purchase.
        #[arg(long)]
        marketplace: bool,

        /// Transaction type (e.g. `buy`), or `salary` / `reward` for income.
        #[arg(long)]
        label: Option<String>,
    },

    /// Print treasury balances and the latest tax records.
    Treasury {
        class_code: String,

        #[arg(long, default_value_t = 10)]
        records: u32,
    },
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = LedgerConfig::load(cli.config.as_deref())?;
    config.apply_overrides(cli.backend, cli.db);
    logging::init(&config.logging)?;

    debug!("connecting to {} backend", config.database.backend);
    let registry = app::build_registry();
    let repo: Arc<dyn LedgerRepository> = Arc::from(
        registry
            .create(&config.database)
            .await
            .with_context(|| format!("cannot open {} ledger store", config.database.backend))?,
    );

    match cli.command {
        Command::Open { class_code } => {
            let treasury = app::open_class(repo.as_ref(), &class_code).await?;
            print!("{treasury}");
        }
        Command::Rates { class_code } => {
            let rates = TaxCalculator::new(repo).rates().get_rates(&class_code).await;
            println!("{rates}");
        }
        Command::Charge {
            kind,
            class_code,
            user_id,
            amount,
            marketplace,
            label,
        } => {
            let request = ChargeRequest {
                kind,
                class_code,
                user_id,
                amount,
                marketplace,
                label,
            };
            let outcome = app::charge(&TaxCalculator::new(repo), &request).await;
            println!("{outcome}");
        }
        Command::Treasury {
            class_code,
            records,
        } => {
            let report = app::treasury_report(repo.as_ref(), &class_code, records)
                .await
                .with_context(|| format!("no treasury for class '{class_code}'"))?;
            print!("{report}");
        }
    }

    Ok(())
}
