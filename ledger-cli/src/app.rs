//! Command implementations shared by the `treasury-ledger` binary and its tests.

use std::fmt::{self, Write as _};

use clap::ValueEnum;
use ledger_core::db::{MemoryRepositoryFactory, RepositoryRegistry};
use ledger_core::{
    IncomeTax, IncomeType, LedgerRepository, RepositoryError, TaxCalculator, Treasury,
    TransactionTax, UnitOfWork,
};
use ledger_db_sqlite::SqliteRepositoryFactory;
use tracing::info;

/// Every backend the binary can open.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry.register(Box::new(MemoryRepositoryFactory));
    registry
}

/// Which calculator operation a `charge` runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChargeKind {
    Item,
    Stock,
    Transaction,
    Income,
    RealEstate,
    Auction,
    Property,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    pub kind: ChargeKind,
    pub class_code: String,
    pub user_id: String,
    pub amount: i64,
    /// Item sales between users rather than store purchases.
    pub marketplace: bool,
    /// Transaction type for trades, or the income type (`salary`, `reward`).
    pub label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeOutcome {
    Transaction(TransactionTax),
    Income(IncomeTax),
}

impl ChargeOutcome {
    pub fn tax_amount(&self) -> i64 {
        match self {
            Self::Transaction(split) => split.tax_amount,
            Self::Income(split) => split.tax_amount,
        }
    }
}

impl fmt::Display for ChargeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transaction(split) => fmt::Display::fmt(split, f),
            Self::Income(split) => fmt::Display::fmt(split, f),
        }
    }
}

/// Run one standalone calculator operation.
pub async fn charge(
    calculator: &TaxCalculator,
    request: &ChargeRequest,
) -> ChargeOutcome {
    let class = request.class_code.as_str();
    let user = request.user_id.as_str();
    let amount = request.amount;
    let label = request.label.as_deref().unwrap_or_default();

    let outcome = match request.kind {
        ChargeKind::Item => ChargeOutcome::Transaction(
            calculator
                .item_tax(class, user, amount, request.marketplace, UnitOfWork::Standalone)
                .await,
        ),
        ChargeKind::Stock => ChargeOutcome::Transaction(
            calculator
                .stock_tax(class, user, amount, label, UnitOfWork::Standalone)
                .await,
        ),
        ChargeKind::Transaction => ChargeOutcome::Transaction(
            calculator
                .transaction_tax(class, user, amount, label, UnitOfWork::Standalone)
                .await,
        ),
        ChargeKind::Income => ChargeOutcome::Income(
            calculator
                .income_tax(
                    class,
                    user,
                    amount,
                    IncomeType::from_label(request.label.as_deref()),
                    UnitOfWork::Standalone,
                )
                .await,
        ),
        ChargeKind::RealEstate => ChargeOutcome::Transaction(
            calculator
                .real_estate_tax(class, user, amount, label, UnitOfWork::Standalone)
                .await,
        ),
        ChargeKind::Auction => ChargeOutcome::Transaction(
            calculator
                .auction_tax(class, user, amount, label, UnitOfWork::Standalone)
                .await,
        ),
        ChargeKind::Property => ChargeOutcome::Transaction(
            calculator
                .property_holding_tax(class, user, amount, UnitOfWork::Standalone)
                .await,
        ),
    };

    info!(
        class_code = class,
        kind = ?request.kind,
        amount,
        tax = outcome.tax_amount(),
        "charge complete"
    );
    outcome
}

/// Create the class treasury if it does not exist yet.
pub async fn open_class(
    repo: &dyn LedgerRepository,
    class_code: &str,
) -> Result<Treasury, RepositoryError> {
    let treasury = repo.open_treasury(class_code).await?;
    info!(class_code, total = treasury.total_amount, "treasury open");
    Ok(treasury)
}

/// Balances plus the `records` most recent audit entries.
pub async fn treasury_report(
    repo: &dyn LedgerRepository,
    class_code: &str,
    records: u32,
) -> Result<String, RepositoryError> {
    let treasury = repo.get_treasury(class_code).await?;
    let recent = repo.list_tax_records(class_code, records).await?;

    let mut out = treasury.to_string();
    if recent.is_empty() {
        out.push_str("no tax records\n");
        return Ok(out);
    }

    out.push_str("recent records:\n");
    for record in &recent {
        // Writing to a String cannot fail.
        let _ = writeln!(
            out,
            "  #{:<6} {} {:<12} {:>10}  {}",
            record.id,
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.category.as_str(),
            record.amount,
            record.description
        );
    }
    Ok(out)
}
