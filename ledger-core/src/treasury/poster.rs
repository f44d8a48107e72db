//! Posting collected tax into a class treasury.
//!
//! A posting is one atomic increment of the treasury balance and of the
//! category's revenue counter. How it is made durable depends on the
//! [`UnitOfWork`]:
//!
//! | unit of work | writes                                   | audit record |
//! |--------------|------------------------------------------|--------------|
//! | `Standalone` | own transaction, committed here          | yes          |
//! | `Joined`     | queued on the caller's open transaction  | no           |
//!
//! Postings are not exactly-once. Retrying after a lost commit
//! acknowledgement applies the increment twice.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error};

use crate::db::{LedgerRepository, LedgerTransaction, RepositoryError};
use crate::models::{NewTaxRecord, TaxCategory, TreasuryIncrement};

/// Where a posting's writes go.
pub enum UnitOfWork<'a> {
    /// Open, fill and commit a dedicated transaction, including an audit record.
    Standalone,
    /// Queue the increment on a transaction the caller will commit.
    Joined(&'a mut dyn LedgerTransaction),
}

impl<'a> From<Option<&'a mut dyn LedgerTransaction>> for UnitOfWork<'a> {
    fn from(tx: Option<&'a mut dyn LedgerTransaction>) -> Self {
        match tx {
            Some(tx) => Self::Joined(tx),
            None => Self::Standalone,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PostingError {
    #[error("tax amount must be positive, got {0}")]
    NonPositiveAmount(i64),

    #[error("class '{0}' has no treasury")]
    MissingTreasury(String),

    #[error("could not open unit of work: {0}")]
    Begin(RepositoryError),

    #[error("could not increment treasury: {0}")]
    Increment(RepositoryError),

    #[error("could not append tax record: {0}")]
    Record(RepositoryError),

    #[error("could not commit tax posting: {0}")]
    Commit(RepositoryError),
}

/// What a successful posting did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingReceipt {
    pub category: TaxCategory,
    pub amount: i64,
    /// Id of the audit record, `None` when the posting joined a caller's unit of work.
    pub record_id: Option<i64>,
}

#[derive(Clone)]
pub struct TreasuryPoster {
    repo: Arc<dyn LedgerRepository>,
}

impl TreasuryPoster {
    pub fn new(repo: Arc<dyn LedgerRepository>) -> Self {
        Self { repo }
    }

    /// Apply `amount` of `category` tax to the class treasury.
    ///
    /// Returns `false` (after logging the cause) instead of failing.
    pub async fn post(
        &self,
        class_code: &str,
        category: TaxCategory,
        amount: i64,
        description: &str,
        unit: UnitOfWork<'_>,
    ) -> bool {
        match self
            .try_post(class_code, category, amount, description, unit)
            .await
        {
            Ok(receipt) => {
                debug!(
                    class_code,
                    %category,
                    amount,
                    record_id = ?receipt.record_id,
                    "tax posted to treasury"
                );
                true
            }
            Err(err) => {
                error!(class_code, %category, amount, error = %err, "tax posting failed");
                false
            }
        }
    }

    /// Strict form of [`post`](Self::post) that reports the failure cause.
    pub async fn try_post(
        &self,
        class_code: &str,
        category: TaxCategory,
        amount: i64,
        description: &str,
        unit: UnitOfWork<'_>,
    ) -> Result<PostingReceipt, PostingError> {
        if amount <= 0 {
            return Err(PostingError::NonPositiveAmount(amount));
        }

        let increment = TreasuryIncrement {
            class_code: class_code.to_string(),
            category,
            amount,
            at: Utc::now(),
        };

        match unit {
            UnitOfWork::Joined(tx) => {
                queue_increment(tx, &increment).await?;
                Ok(PostingReceipt {
                    category,
                    amount,
                    record_id: None,
                })
            }
            UnitOfWork::Standalone => {
                let record = NewTaxRecord {
                    class_code: class_code.to_string(),
                    category,
                    amount,
                    description: description.to_string(),
                };
                let record_id = self.post_standalone(&increment, &record).await?;
                Ok(PostingReceipt {
                    category,
                    amount,
                    record_id: Some(record_id),
                })
            }
        }
    }

    async fn post_standalone(
        &self,
        increment: &TreasuryIncrement,
        record: &NewTaxRecord,
    ) -> Result<i64, PostingError> {
        let mut tx = self.repo.begin().await.map_err(PostingError::Begin)?;

        let staged = match queue_increment(tx.as_mut(), increment).await {
            Ok(()) => tx
                .append_tax_record(record)
                .await
                .map_err(PostingError::Record),
            Err(err) => Err(err),
        };

        match staged {
            Ok(record_id) => {
                tx.commit().await.map_err(PostingError::Commit)?;
                Ok(record_id)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    debug!(error = %rollback_err, "rollback after failed tax posting also failed");
                }
                Err(err)
            }
        }
    }
}

async fn queue_increment(
    tx: &mut dyn LedgerTransaction,
    increment: &TreasuryIncrement,
) -> Result<(), PostingError> {
    tx.increment_treasury(increment)
        .await
        .map_err(|err| match err {
            RepositoryError::NotFound => PostingError::MissingTreasury(increment.class_code.clone()),
            other => PostingError::Increment(other),
        })
}
