pub mod calculations;
pub mod db;
pub mod models;
pub mod treasury;

#[cfg(test)]
mod testing;

pub use calculations::{RateError, RateResolver, TaxCalculator};
pub use db::repository::{LedgerRepository, LedgerTransaction, RepositoryError};
pub use models::*;
pub use treasury::{PostingError, PostingReceipt, TreasuryPoster, UnitOfWork};
