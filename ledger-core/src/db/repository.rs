use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewTaxRecord, RateOverrides, TaxRecord, Treasury, TreasuryIncrement};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

#[async_trait]
pub trait LedgerRepository: Send + Sync {
    // Tax settings
    async fn get_tax_settings(
        &self,
        class_code: &str,
    ) -> Result<Option<RateOverrides>, RepositoryError>;
    async fn save_tax_settings(
        &self,
        class_code: &str,
        overrides: &RateOverrides,
    ) -> Result<(), RepositoryError>;

    // Treasury
    async fn open_treasury(&self, class_code: &str) -> Result<Treasury, RepositoryError>;
    async fn get_treasury(&self, class_code: &str) -> Result<Treasury, RepositoryError>;

    // Audit records
    async fn list_tax_records(
        &self,
        class_code: &str,
        limit: u32,
    ) -> Result<Vec<TaxRecord>, RepositoryError>;

    /// Start a unit of work. Writes queued on it become visible only after
    /// [`LedgerTransaction::commit`].
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, RepositoryError>;
}

/// An open atomic unit of work against a [`LedgerRepository`].
///
/// Dropping a transaction without committing discards everything queued on it.
#[async_trait]
pub trait LedgerTransaction: Send {
    /// Queue `total_amount += amount`, `<category counter> += amount` and a
    /// `last_updated` refresh. Fails with [`RepositoryError::NotFound`] when
    /// the class has no treasury.
    async fn increment_treasury(
        &mut self,
        increment: &TreasuryIncrement,
    ) -> Result<(), RepositoryError>;

    /// Queue a new audit record and return its id.
    async fn append_tax_record(&mut self, record: &NewTaxRecord) -> Result<i64, RepositoryError>;

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError>;
}
