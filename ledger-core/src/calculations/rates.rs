//! Per-class rate resolution.
//!
//! A class only stores the rates it wants to change. Everything else comes
//! from an immutable default [`RateSet`], so the calculator always sees a
//! complete set of rates, even when the settings read fails.

use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, warn};

use crate::db::{LedgerRepository, RepositoryError};
use crate::models::{RateOverrides, RateSet};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateError {
    #[error("rate '{name}' is {value}, expected a fraction between 0 and 1")]
    OutOfRange { name: &'static str, value: Decimal },

    #[error("failed to read tax settings: {0}")]
    Repository(#[from] RepositoryError),
}

/// Overlay `overrides` onto `defaults`. Fields left `None` keep the default.
pub fn merge(
    defaults: &RateSet,
    overrides: &RateOverrides,
) -> RateSet {
    RateSet {
        stock_transaction_rate: overrides
            .stock_transaction_rate
            .unwrap_or(defaults.stock_transaction_rate),
        real_estate_transaction_rate: overrides
            .real_estate_transaction_rate
            .unwrap_or(defaults.real_estate_transaction_rate),
        item_store_vat: overrides.item_store_vat.unwrap_or(defaults.item_store_vat),
        auction_transaction_rate: overrides
            .auction_transaction_rate
            .unwrap_or(defaults.auction_transaction_rate),
        property_holding_tax_rate: overrides
            .property_holding_tax_rate
            .unwrap_or(defaults.property_holding_tax_rate),
        item_market_transaction_rate: overrides
            .item_market_transaction_rate
            .unwrap_or(defaults.item_market_transaction_rate),
        income_tax_rate: overrides.income_tax_rate.unwrap_or(defaults.income_tax_rate),
        transaction_tax_rate: overrides
            .transaction_tax_rate
            .unwrap_or(defaults.transaction_tax_rate),
        salary_tax_rate: overrides.salary_tax_rate.unwrap_or(defaults.salary_tax_rate),
        reward_tax_rate: overrides.reward_tax_rate.unwrap_or(defaults.reward_tax_rate),
    }
}

/// Reject any configured rate outside `[0, 1]`.
pub fn validate(overrides: &RateOverrides) -> Result<(), RateError> {
    for (name, rate) in overrides.entries() {
        match rate {
            Some(value) if !(Decimal::ZERO..=Decimal::ONE).contains(&value) => {
                return Err(RateError::OutOfRange { name, value });
            }
            _ => {}
        }
    }
    Ok(())
}

/// Loads the effective rates for a class.
#[derive(Clone)]
pub struct RateResolver {
    repo: Arc<dyn LedgerRepository>,
    defaults: RateSet,
}

impl RateResolver {
    pub fn new(repo: Arc<dyn LedgerRepository>) -> Self {
        Self::with_defaults(repo, RateSet::DEFAULT)
    }

    pub fn with_defaults(
        repo: Arc<dyn LedgerRepository>,
        defaults: RateSet,
    ) -> Self {
        Self { repo, defaults }
    }

    pub fn defaults(&self) -> &RateSet {
        &self.defaults
    }

    /// Stored rates merged over the defaults.
    ///
    /// Never fails: a missing, unreadable or invalid settings document is
    /// logged and the defaults are returned instead.
    pub async fn get_rates(&self, class_code: &str) -> RateSet {
        match self.try_get_rates(class_code).await {
            Ok(rates) => rates,
            Err(error) => {
                warn!(class_code, %error, "falling back to default tax rates");
                self.defaults
            }
        }
    }

    /// Like [`get_rates`](Self::get_rates) but reports why the stored
    /// settings could not be used.
    pub async fn try_get_rates(&self, class_code: &str) -> Result<RateSet, RateError> {
        match self.repo.get_tax_settings(class_code).await? {
            Some(overrides) => {
                validate(&overrides)?;
                Ok(merge(&self.defaults, &overrides))
            }
            None => {
                debug!(class_code, "no tax settings stored, using defaults");
                Ok(self.defaults)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use tracing_subscriber::fmt::format::FmtSpan;

    use super::*;
    use crate::db::MemoryRepository;
    use crate::testing::FailingRepository;

    /// Shows fallback warnings in test output.
    fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_span_events(FmtSpan::NONE)
            .with_test_writer()
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    #[test]
    fn merge_empty_overrides_is_defaults() {
        assert_eq!(
            merge(&RateSet::DEFAULT, &RateOverrides::default()),
            RateSet::DEFAULT
        );
    }

    #[test]
    fn merge_replaces_only_overridden_fields() {
        let overrides = RateOverrides {
            salary_tax_rate: Some(dec!(0.2)),
            item_store_vat: Some(dec!(0)),
            ..Default::default()
        };

        let merged = merge(&RateSet::DEFAULT, &overrides);

        assert_eq!(
            merged,
            RateSet {
                salary_tax_rate: dec!(0.2),
                item_store_vat: dec!(0),
                ..RateSet::DEFAULT
            }
        );
    }

    #[test]
    fn validate_accepts_bounds() {
        let overrides = RateOverrides {
            stock_transaction_rate: Some(dec!(0)),
            reward_tax_rate: Some(dec!(1)),
            ..Default::default()
        };

        assert_eq!(validate(&overrides), Ok(()));
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let overrides = RateOverrides {
            auction_transaction_rate: Some(dec!(1.5)),
            ..Default::default()
        };

        assert_eq!(
            validate(&overrides),
            Err(RateError::OutOfRange {
                name: "auction_transaction_rate",
                value: dec!(1.5)
            })
        );
    }

    #[test]
    fn validate_rejects_negative() {
        let overrides = RateOverrides {
            transaction_tax_rate: Some(dec!(-0.01)),
            ..Default::default()
        };

        assert!(matches!(
            validate(&overrides),
            Err(RateError::OutOfRange { name: "transaction_tax_rate", .. })
        ));
    }

    #[tokio::test]
    async fn class_without_settings_gets_exact_defaults() {
        let resolver = RateResolver::new(Arc::new(MemoryRepository::new()));

        assert_eq!(resolver.get_rates("C1").await, RateSet::DEFAULT);
    }

    #[tokio::test]
    async fn income_override_keeps_other_defaults() {
        let repo = MemoryRepository::new();
        repo.save_tax_settings(
            "C1",
            &RateOverrides {
                income_tax_rate: Some(dec!(0.25)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let resolver = RateResolver::new(Arc::new(repo));

        let rates = resolver.get_rates("C1").await;

        assert_eq!(
            rates,
            RateSet {
                income_tax_rate: dec!(0.25),
                ..RateSet::DEFAULT
            }
        );
    }

    #[tokio::test]
    async fn settings_are_per_class() {
        let repo = MemoryRepository::new();
        repo.save_tax_settings(
            "C1",
            &RateOverrides {
                stock_transaction_rate: Some(dec!(0.02)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let resolver = RateResolver::new(Arc::new(repo));

        assert_eq!(resolver.get_rates("C2").await, RateSet::DEFAULT);
    }

    #[tokio::test]
    async fn read_failure_falls_back_to_defaults() {
        let _guard = init_test_tracing();
        let resolver = RateResolver::new(Arc::new(FailingRepository));

        assert_eq!(resolver.get_rates("C1").await, RateSet::DEFAULT);
        assert!(matches!(
            resolver.try_get_rates("C1").await,
            Err(RateError::Repository(RepositoryError::Connection(_)))
        ));
    }

    #[tokio::test]
    async fn invalid_stored_rate_falls_back_to_defaults() {
        let _guard = init_test_tracing();
        let repo = MemoryRepository::new();
        repo.save_tax_settings(
            "C1",
            &RateOverrides {
                income_tax_rate: Some(dec!(0.3)),
                salary_tax_rate: Some(dec!(12)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let resolver = RateResolver::new(Arc::new(repo));

        assert_eq!(resolver.get_rates("C1").await, RateSet::DEFAULT);
    }

    #[tokio::test]
    async fn injected_defaults_are_used() {
        let custom = RateSet {
            transaction_tax_rate: dec!(0.02),
            ..RateSet::DEFAULT
        };
        let resolver = RateResolver::with_defaults(Arc::new(MemoryRepository::new()), custom);

        assert_eq!(resolver.get_rates("C1").await, custom);
        assert_eq!(resolver.defaults(), &custom);
    }
}
