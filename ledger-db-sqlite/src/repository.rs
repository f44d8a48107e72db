use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ledger_core::{
    LedgerRepository, LedgerTransaction, NewTaxRecord, RateOverrides, RepositoryError,
    RevenueBreakdown, TaxCategory, TaxRecord, Treasury, TreasuryIncrement,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use tracing::debug;

use crate::decimal::{get_rate, rate_to_f64};

const TREASURY_COLUMNS: &str = "class_code, total_amount, item_store_revenue, item_market_revenue,
     stock_revenue, transaction_revenue, income_revenue, real_estate_revenue,
     auction_revenue, property_revenue, last_updated";

fn db_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Connect to `database_url`, which may be a bare file path, a
    /// `sqlite:` URL or `:memory:`. Database files are created on demand.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {}", database_url))?
            .create_if_missing(true);

        // An in-memory database lives only as long as its connection.
        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_rate_overrides(row: &SqliteRow) -> Result<RateOverrides, RepositoryError> {
    Ok(RateOverrides {
        stock_transaction_rate: get_rate(row, "stock_transaction_rate")?,
        real_estate_transaction_rate: get_rate(row, "real_estate_transaction_rate")?,
        item_store_vat: get_rate(row, "item_store_vat")?,
        auction_transaction_rate: get_rate(row, "auction_transaction_rate")?,
        property_holding_tax_rate: get_rate(row, "property_holding_tax_rate")?,
        item_market_transaction_rate: get_rate(row, "item_market_transaction_rate")?,
        income_tax_rate: get_rate(row, "income_tax_rate")?,
        transaction_tax_rate: get_rate(row, "transaction_tax_rate")?,
        salary_tax_rate: get_rate(row, "salary_tax_rate")?,
        reward_tax_rate: get_rate(row, "reward_tax_rate")?,
    })
}

fn row_to_treasury(row: &SqliteRow) -> Result<Treasury, RepositoryError> {
    let counter = |column: &str| -> Result<i64, RepositoryError> {
        row.try_get(column).map_err(db_error)
    };

    Ok(Treasury {
        class_code: row.try_get("class_code").map_err(db_error)?,
        total_amount: counter("total_amount")?,
        revenue: RevenueBreakdown {
            item_store: counter("item_store_revenue")?,
            item_market: counter("item_market_revenue")?,
            stock: counter("stock_revenue")?,
            transaction: counter("transaction_revenue")?,
            income: counter("income_revenue")?,
            real_estate: counter("real_estate_revenue")?,
            auction: counter("auction_revenue")?,
            property: counter("property_revenue")?,
        },
        last_updated: row
            .try_get::<DateTime<Utc>, _>("last_updated")
            .map_err(|e| RepositoryError::Database(format!("Failed to get last_updated: {}", e)))?,
    })
}

fn row_to_tax_record(row: &SqliteRow) -> Result<TaxRecord, RepositoryError> {
    let tax_type: String = row.try_get("tax_type").map_err(db_error)?;
    let category = TaxCategory::parse(&tax_type)
        .ok_or_else(|| RepositoryError::Database(format!("Invalid tax type: {}", tax_type)))?;

    Ok(TaxRecord {
        id: row.try_get("id").map_err(db_error)?,
        class_code: row.try_get("class_code").map_err(db_error)?,
        category,
        amount: row.try_get("amount").map_err(db_error)?,
        description: row.try_get("description").map_err(db_error)?,
        timestamp: row
            .try_get::<DateTime<Utc>, _>("timestamp")
            .map_err(|e| RepositoryError::Database(format!("Failed to get timestamp: {}", e)))?,
    })
}

#[async_trait]
impl LedgerRepository for SqliteRepository {
    async fn get_tax_settings(
        &self,
        class_code: &str,
    ) -> Result<Option<RateOverrides>, RepositoryError> {
        let row = sqlx::query(
            "SELECT stock_transaction_rate, real_estate_transaction_rate, item_store_vat,
                    auction_transaction_rate, property_holding_tax_rate,
                    item_market_transaction_rate, income_tax_rate, transaction_tax_rate,
                    salary_tax_rate, reward_tax_rate
             FROM tax_settings WHERE class_code = ?",
        )
        .bind(class_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.as_ref().map(row_to_rate_overrides).transpose()
    }

    async fn save_tax_settings(
        &self,
        class_code: &str,
        overrides: &RateOverrides,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO tax_settings (
                class_code, stock_transaction_rate, real_estate_transaction_rate,
                item_store_vat, auction_transaction_rate, property_holding_tax_rate,
                item_market_transaction_rate, income_tax_rate, transaction_tax_rate,
                salary_tax_rate, reward_tax_rate, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(class_code) DO UPDATE SET
                stock_transaction_rate = excluded.stock_transaction_rate,
                real_estate_transaction_rate = excluded.real_estate_transaction_rate,
                item_store_vat = excluded.item_store_vat,
                auction_transaction_rate = excluded.auction_transaction_rate,
                property_holding_tax_rate = excluded.property_holding_tax_rate,
                item_market_transaction_rate = excluded.item_market_transaction_rate,
                income_tax_rate = excluded.income_tax_rate,
                transaction_tax_rate = excluded.transaction_tax_rate,
                salary_tax_rate = excluded.salary_tax_rate,
                reward_tax_rate = excluded.reward_tax_rate,
                updated_at = excluded.updated_at",
        )
        .bind(class_code)
        .bind(overrides.stock_transaction_rate.map(rate_to_f64))
        .bind(overrides.real_estate_transaction_rate.map(rate_to_f64))
        .bind(overrides.item_store_vat.map(rate_to_f64))
        .bind(overrides.auction_transaction_rate.map(rate_to_f64))
        .bind(overrides.property_holding_tax_rate.map(rate_to_f64))
        .bind(overrides.item_market_transaction_rate.map(rate_to_f64))
        .bind(overrides.income_tax_rate.map(rate_to_f64))
        .bind(overrides.transaction_tax_rate.map(rate_to_f64))
        .bind(overrides.salary_tax_rate.map(rate_to_f64))
        .bind(overrides.reward_tax_rate.map(rate_to_f64))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn open_treasury(
        &self,
        class_code: &str,
    ) -> Result<Treasury, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO treasury (class_code, last_updated) VALUES (?, ?)
             ON CONFLICT(class_code) DO NOTHING",
        )
        .bind(class_code)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() > 0 {
            debug!(class_code, "treasury opened");
        }

        self.get_treasury(class_code).await
    }

    async fn get_treasury(
        &self,
        class_code: &str,
    ) -> Result<Treasury, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM treasury WHERE class_code = ?",
            TREASURY_COLUMNS
        ))
        .bind(class_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_treasury(&row)
    }

    async fn list_tax_records(
        &self,
        class_code: &str,
        limit: u32,
    ) -> Result<Vec<TaxRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, class_code, tax_type, amount, description, timestamp
             FROM tax_records WHERE class_code = ?
             ORDER BY id DESC LIMIT ?",
        )
        .bind(class_code)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(row_to_tax_record).collect()
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, RepositoryError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;
        Ok(Box::new(SqliteTransaction { tx }))
    }
}

/// A unit of work backed by a SQLite transaction. Dropping it rolls back.
pub struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl LedgerTransaction for SqliteTransaction {
    async fn increment_treasury(
        &mut self,
        increment: &TreasuryIncrement,
    ) -> Result<(), RepositoryError> {
        // Column names come from a closed enum, never from input.
        let column = increment.category.revenue_field();
        let sql = format!(
            "UPDATE treasury SET
                total_amount = total_amount + ?,
                {column} = {column} + ?,
                last_updated = ?
             WHERE class_code = ?"
        );

        let result = sqlx::query(&sql)
            .bind(increment.amount)
            .bind(increment.amount)
            .bind(increment.at)
            .bind(&increment.class_code)
            .execute(&mut *self.tx)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn append_tax_record(
        &mut self,
        record: &NewTaxRecord,
    ) -> Result<i64, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO tax_records (class_code, tax_type, amount, description, timestamp)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&record.class_code)
        .bind(record.category.as_str())
        .bind(record.amount)
        .bind(&record.description)
        .bind(Utc::now())
        .execute(&mut *self.tx)
        .await
        .map_err(db_error)?;

        Ok(result.last_insert_rowid())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let SqliteTransaction { tx } = *self;
        tx.commit().await.map_err(db_error)
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError> {
        let SqliteTransaction { tx } = *self;
        tx.rollback().await.map_err(db_error)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    async fn setup_test_db() -> SqliteRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        let repo = SqliteRepository::new_with_pool(pool).await;
        repo.run_migrations()
            .await
            .expect("Failed to run migrations");
        repo
    }

    fn increment(
        class_code: &str,
        category: TaxCategory,
        amount: i64,
    ) -> TreasuryIncrement {
        TreasuryIncrement {
            class_code: class_code.to_string(),
            category,
            amount,
            at: Utc::now(),
        }
    }

    fn new_record(
        class_code: &str,
        category: TaxCategory,
        amount: i64,
    ) -> NewTaxRecord {
        NewTaxRecord {
            class_code: class_code.to_string(),
            category,
            amount,
            description: format!("{} test", category.label()),
        }
    }

    // Tax settings

    #[tokio::test]
    async fn test_get_tax_settings_missing_is_none() {
        let repo = setup_test_db().await;

        assert_eq!(repo.get_tax_settings("C1").await, Ok(None));
    }

    #[tokio::test]
    async fn test_save_and_get_tax_settings() {
        let repo = setup_test_db().await;
        let overrides = RateOverrides {
            income_tax_rate: Some(dec!(0.25)),
            transaction_tax_rate: Some(dec!(0.005)),
            property_holding_tax_rate: Some(dec!(0.002)),
            ..Default::default()
        };

        repo.save_tax_settings("C1", &overrides)
            .await
            .expect("Should save settings");

        assert_eq!(repo.get_tax_settings("C1").await, Ok(Some(overrides)));
    }

    #[tokio::test]
    async fn test_save_tax_settings_replaces_document() {
        let repo = setup_test_db().await;
        repo.save_tax_settings(
            "C1",
            &RateOverrides {
                stock_transaction_rate: Some(dec!(0.02)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let replacement = RateOverrides {
            salary_tax_rate: Some(dec!(0.15)),
            ..Default::default()
        };
        repo.save_tax_settings("C1", &replacement).await.unwrap();

        assert_eq!(repo.get_tax_settings("C1").await, Ok(Some(replacement)));
    }

    #[tokio::test]
    async fn test_get_tax_settings_text_rate_is_error() {
        let repo = setup_test_db().await;
        sqlx::query(
            "INSERT INTO tax_settings (class_code, salary_tax_rate, updated_at)
             VALUES ('C1', 'a lot', '2025-01-01T00:00:00Z')",
        )
        .execute(repo.pool())
        .await
        .expect("Failed to insert malformed settings");

        let result = repo.get_tax_settings("C1").await;

        assert!(matches!(result, Err(RepositoryError::Database(msg)) if msg.contains("salary_tax_rate")));
    }

    // Treasury

    #[tokio::test]
    async fn test_open_treasury_starts_empty() {
        let repo = setup_test_db().await;

        let treasury = repo.open_treasury("C1").await.expect("Should open");

        assert_eq!(treasury.class_code, "C1");
        assert_eq!(treasury.total_amount, 0);
        assert_eq!(treasury.revenue, RevenueBreakdown::default());
    }

    #[tokio::test]
    async fn test_open_treasury_is_idempotent() {
        let repo = setup_test_db().await;
        repo.open_treasury("C1").await.unwrap();

        let mut tx = repo.begin().await.unwrap();
        tx.increment_treasury(&increment("C1", TaxCategory::Stock, 40))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let reopened = repo.open_treasury("C1").await.unwrap();

        assert_eq!(reopened.total_amount, 40);
        assert_eq!(reopened.revenue.stock, 40);
    }

    #[tokio::test]
    async fn test_get_treasury_not_found() {
        let repo = setup_test_db().await;

        assert_eq!(repo.get_treasury("C9").await, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_increment_updates_total_and_counter() {
        let repo = setup_test_db().await;
        let opened = repo.open_treasury("C1").await.unwrap();
        let later = opened.last_updated + Duration::seconds(30);

        let mut tx = repo.begin().await.unwrap();
        tx.increment_treasury(&increment("C1", TaxCategory::Income, 5000))
            .await
            .unwrap();
        tx.increment_treasury(&TreasuryIncrement {
            at: later,
            ..increment("C1", TaxCategory::ItemStore, 99)
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let treasury = repo.get_treasury("C1").await.unwrap();
        assert_eq!(treasury.total_amount, 5099);
        assert_eq!(treasury.revenue.income, 5000);
        assert_eq!(treasury.revenue.item_store, 99);
        assert!(treasury.is_balanced());
        assert_eq!(treasury.last_updated, later);
    }

    #[tokio::test]
    async fn test_increment_every_category_column() {
        let repo = setup_test_db().await;
        repo.open_treasury("C1").await.unwrap();

        let mut tx = repo.begin().await.unwrap();
        for (i, category) in TaxCategory::ALL.into_iter().enumerate() {
            tx.increment_treasury(&increment("C1", category, i as i64 + 1))
                .await
                .unwrap();
        }
        tx.commit().await.unwrap();

        let treasury = repo.get_treasury("C1").await.unwrap();
        for (i, category) in TaxCategory::ALL.into_iter().enumerate() {
            assert_eq!(treasury.revenue.get(category), i as i64 + 1, "{category}");
        }
        assert!(treasury.is_balanced());
    }

    #[tokio::test]
    async fn test_increment_missing_treasury_is_not_found() {
        let repo = setup_test_db().await;

        let mut tx = repo.begin().await.unwrap();
        let result = tx
            .increment_treasury(&increment("C9", TaxCategory::Stock, 1))
            .await;

        assert_eq!(result, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let repo = setup_test_db().await;
        repo.open_treasury("C1").await.unwrap();

        let mut tx = repo.begin().await.unwrap();
        tx.increment_treasury(&increment("C1", TaxCategory::Auction, 30))
            .await
            .unwrap();
        tx.append_tax_record(&new_record("C1", TaxCategory::Auction, 30))
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(repo.get_treasury("C1").await.unwrap().total_amount, 0);
        assert!(repo.list_tax_records("C1", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_writes() {
        let repo = setup_test_db().await;
        repo.open_treasury("C1").await.unwrap();

        {
            let mut tx = repo.begin().await.unwrap();
            tx.increment_treasury(&increment("C1", TaxCategory::Stock, 7))
                .await
                .unwrap();
        }

        assert_eq!(repo.get_treasury("C1").await.unwrap().total_amount, 0);
    }

    // Tax records

    #[tokio::test]
    async fn test_list_tax_records_newest_first_with_limit() {
        let repo = setup_test_db().await;
        let mut tx = repo.begin().await.unwrap();
        let mut ids = Vec::new();
        for amount in [10, 20, 30] {
            ids.push(
                tx.append_tax_record(&new_record("C1", TaxCategory::Stock, amount))
                    .await
                    .unwrap(),
            );
        }
        tx.append_tax_record(&new_record("C2", TaxCategory::Income, 99))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let records = repo.list_tax_records("C1", 2).await.unwrap();

        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, ids[2]);
        assert_eq!(records[0].amount, 30);
        assert_eq!(records[1].amount, 20);
        assert_eq!(records[0].category, TaxCategory::Stock);
        assert_eq!(records[0].description, "Stock transaction tax test");
    }

    #[tokio::test]
    async fn test_append_rejects_non_positive_amount() {
        let repo = setup_test_db().await;
        let mut tx = repo.begin().await.unwrap();

        let result = tx
            .append_tax_record(&new_record("C1", TaxCategory::Stock, 0))
            .await;

        assert!(matches!(result, Err(RepositoryError::Database(_))));
    }

    #[tokio::test]
    async fn test_list_tax_records_unknown_type_is_error() {
        let repo = setup_test_db().await;
        sqlx::query(
            "INSERT INTO tax_records (class_code, tax_type, amount, description, timestamp)
             VALUES ('C1', 'lottery', 5, 'x', '2025-01-01T00:00:00Z')",
        )
        .execute(repo.pool())
        .await
        .expect("Failed to insert record");

        let result = repo.list_tax_records("C1", 10).await;

        assert_eq!(
            result,
            Err(RepositoryError::Database("Invalid tax type: lottery".to_string()))
        );
    }

    #[tokio::test]
    async fn test_new_creates_database_file() {
        let dir = std::env::temp_dir().join(format!("ledger-db-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("ledger.db");
        let _ = std::fs::remove_file(&path);

        let repo = SqliteRepository::new(path.to_str().unwrap())
            .await
            .expect("Should create database file");
        repo.run_migrations().await.unwrap();
        repo.open_treasury("C1").await.unwrap();

        assert!(path.exists());
        drop(repo);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
