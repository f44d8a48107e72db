//! Repository doubles shared by the unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::db::{LedgerRepository, LedgerTransaction, MemoryRepository, RepositoryError};
use crate::models::{NewTaxRecord, RateOverrides, TaxRecord, Treasury, TreasuryIncrement};

fn offline() -> RepositoryError {
    RepositoryError::Connection("store offline".to_string())
}

/// Every call fails as if the store were unreachable.
pub struct FailingRepository;

#[async_trait]
impl LedgerRepository for FailingRepository {
    async fn get_tax_settings(&self, _: &str) -> Result<Option<RateOverrides>, RepositoryError> {
        Err(offline())
    }
    async fn save_tax_settings(&self, _: &str, _: &RateOverrides) -> Result<(), RepositoryError> {
        Err(offline())
    }
    async fn open_treasury(&self, _: &str) -> Result<Treasury, RepositoryError> {
        Err(offline())
    }
    async fn get_treasury(&self, _: &str) -> Result<Treasury, RepositoryError> {
        Err(offline())
    }
    async fn list_tax_records(&self, _: &str, _: u32) -> Result<Vec<TaxRecord>, RepositoryError> {
        Err(offline())
    }
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, RepositoryError> {
        Err(offline())
    }
}

/// Step of a unit of work at which [`SpyRepository`] injects a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Nothing,
    Begin,
    Increment,
    Append,
    Commit,
}

/// Counts calls into a [`MemoryRepository`] and optionally fails one step.
#[derive(Clone)]
pub struct SpyRepository {
    pub inner: MemoryRepository,
    fail_at: FailAt,
    begins: Arc<AtomicUsize>,
    increments: Arc<AtomicUsize>,
}

impl SpyRepository {
    pub fn new(inner: MemoryRepository) -> Self {
        Self::failing_at(inner, FailAt::Nothing)
    }

    pub fn failing_at(inner: MemoryRepository, fail_at: FailAt) -> Self {
        Self {
            inner,
            fail_at,
            begins: Arc::new(AtomicUsize::new(0)),
            increments: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn begins(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }

    pub fn increments(&self) -> usize {
        self.increments.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerRepository for SpyRepository {
    async fn get_tax_settings(
        &self,
        class_code: &str,
    ) -> Result<Option<RateOverrides>, RepositoryError> {
        self.inner.get_tax_settings(class_code).await
    }
    async fn save_tax_settings(
        &self,
        class_code: &str,
        overrides: &RateOverrides,
    ) -> Result<(), RepositoryError> {
        self.inner.save_tax_settings(class_code, overrides).await
    }
    async fn open_treasury(&self, class_code: &str) -> Result<Treasury, RepositoryError> {
        self.inner.open_treasury(class_code).await
    }
    async fn get_treasury(&self, class_code: &str) -> Result<Treasury, RepositoryError> {
        self.inner.get_treasury(class_code).await
    }
    async fn list_tax_records(
        &self,
        class_code: &str,
        limit: u32,
    ) -> Result<Vec<TaxRecord>, RepositoryError> {
        self.inner.list_tax_records(class_code, limit).await
    }
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, RepositoryError> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == FailAt::Begin {
            return Err(offline());
        }
        Ok(Box::new(SpyTransaction {
            inner: self.inner.begin().await?,
            fail_at: self.fail_at,
            increments: Arc::clone(&self.increments),
        }))
    }
}

pub struct SpyTransaction {
    inner: Box<dyn LedgerTransaction>,
    fail_at: FailAt,
    increments: Arc<AtomicUsize>,
}

impl SpyTransaction {
    /// Wraps a transaction opened elsewhere so a caller-owned unit of work
    /// can be observed too.
    pub fn observe(inner: Box<dyn LedgerTransaction>, spy: &SpyRepository) -> Self {
        Self {
            inner,
            fail_at: spy.fail_at,
            increments: Arc::clone(&spy.increments),
        }
    }
}

#[async_trait]
impl LedgerTransaction for SpyTransaction {
    async fn increment_treasury(
        &mut self,
        increment: &TreasuryIncrement,
    ) -> Result<(), RepositoryError> {
        self.increments.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == FailAt::Increment {
            return Err(offline());
        }
        self.inner.increment_treasury(increment).await
    }
    async fn append_tax_record(&mut self, record: &NewTaxRecord) -> Result<i64, RepositoryError> {
        if self.fail_at == FailAt::Append {
            return Err(RepositoryError::Database("permission denied".to_string()));
        }
        self.inner.append_tax_record(record).await
    }
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        if self.fail_at == FailAt::Commit {
            return Err(offline());
        }
        self.inner.commit().await
    }
    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError> {
        self.inner.rollback().await
    }
}
