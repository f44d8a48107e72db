//! Process-local ledger backend.
//!
//! Keeps every class in a single map behind a mutex. A transaction only
//! stages its writes; `commit` applies all of them while holding the lock,
//! so concurrent commits never lose an increment and a dropped transaction
//! leaves nothing behind.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::factory::{DbConfig, RepositoryFactory};
use super::repository::{LedgerRepository, LedgerTransaction, RepositoryError};
use crate::models::{NewTaxRecord, RateOverrides, TaxRecord, Treasury, TreasuryIncrement};

#[derive(Debug, Default)]
struct MemoryState {
    settings: HashMap<String, RateOverrides>,
    treasuries: HashMap<String, Treasury>,
    records: Vec<TaxRecord>,
    last_record_id: i64,
}

fn lock(state: &Mutex<MemoryState>) -> Result<MutexGuard<'_, MemoryState>, RepositoryError> {
    state
        .lock()
        .map_err(|_| RepositoryError::Database("memory store lock poisoned".to_string()))
}

#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerRepository for MemoryRepository {
    async fn get_tax_settings(
        &self,
        class_code: &str,
    ) -> Result<Option<RateOverrides>, RepositoryError> {
        Ok(lock(&self.state)?.settings.get(class_code).cloned())
    }

    async fn save_tax_settings(
        &self,
        class_code: &str,
        overrides: &RateOverrides,
    ) -> Result<(), RepositoryError> {
        lock(&self.state)?
            .settings
            .insert(class_code.to_string(), overrides.clone());
        Ok(())
    }

    async fn open_treasury(&self, class_code: &str) -> Result<Treasury, RepositoryError> {
        let mut state = lock(&self.state)?;
        let treasury = state
            .treasuries
            .entry(class_code.to_string())
            .or_insert_with(|| Treasury::new(class_code, Utc::now()));
        Ok(treasury.clone())
    }

    async fn get_treasury(&self, class_code: &str) -> Result<Treasury, RepositoryError> {
        lock(&self.state)?
            .treasuries
            .get(class_code)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_tax_records(
        &self,
        class_code: &str,
        limit: u32,
    ) -> Result<Vec<TaxRecord>, RepositoryError> {
        Ok(lock(&self.state)?
            .records
            .iter()
            .rev()
            .filter(|r| r.class_code == class_code)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, RepositoryError> {
        Ok(Box::new(MemoryTransaction {
            state: Arc::clone(&self.state),
            staged: Vec::new(),
        }))
    }
}

enum StagedWrite {
    Increment(TreasuryIncrement),
    Record(i64, NewTaxRecord),
}

pub struct MemoryTransaction {
    state: Arc<Mutex<MemoryState>>,
    staged: Vec<StagedWrite>,
}

#[async_trait]
impl LedgerTransaction for MemoryTransaction {
    async fn increment_treasury(
        &mut self,
        increment: &TreasuryIncrement,
    ) -> Result<(), RepositoryError> {
        if !lock(&self.state)?
            .treasuries
            .contains_key(&increment.class_code)
        {
            return Err(RepositoryError::NotFound);
        }
        self.staged.push(StagedWrite::Increment(increment.clone()));
        Ok(())
    }

    async fn append_tax_record(&mut self, record: &NewTaxRecord) -> Result<i64, RepositoryError> {
        // Ids are reserved up front, so a rolled back record leaves a gap.
        let id = {
            let mut state = lock(&self.state)?;
            state.last_record_id += 1;
            state.last_record_id
        };
        self.staged.push(StagedWrite::Record(id, record.clone()));
        Ok(id)
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let MemoryTransaction { state, staged } = *self;
        let mut state = lock(&state)?;

        // Validate first so a failed commit applies nothing.
        let missing_treasury = staged.iter().any(|write| match write {
            StagedWrite::Increment(inc) => !state.treasuries.contains_key(&inc.class_code),
            StagedWrite::Record(..) => false,
        });
        if missing_treasury {
            return Err(RepositoryError::NotFound);
        }

        let now = Utc::now();
        for write in staged {
            match write {
                StagedWrite::Increment(inc) => {
                    if let Some(treasury) = state.treasuries.get_mut(&inc.class_code) {
                        treasury.apply(&inc);
                    }
                }
                StagedWrite::Record(id, record) => state.records.push(TaxRecord {
                    id,
                    class_code: record.class_code,
                    category: record.category,
                    amount: record.amount,
                    description: record.description,
                    timestamp: now,
                }),
            }
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// [`RepositoryFactory`] for the in-process `"memory"` backend.
/// The connection string is ignored; every `create` yields an empty store.
pub struct MemoryRepositoryFactory;

#[async_trait]
impl RepositoryFactory for MemoryRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create(
        &self,
        _config: &DbConfig,
    ) -> Result<Box<dyn LedgerRepository>, RepositoryError> {
        Ok(Box::new(MemoryRepository::new()))
    }
}
