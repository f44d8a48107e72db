use std::collections::HashSet;
use std::io::Read;

use ledger_core::calculations::rates::{self, RateError};
use ledger_core::{LedgerRepository, RateOverrides, RepositoryError};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur when loading class tax settings.
#[derive(Debug, Error)]
pub enum TaxSettingsLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Row {row}: class_code is empty")]
    EmptyClassCode { row: usize },

    #[error("Class '{0}' appears more than once")]
    DuplicateClass(String),

    #[error("Class '{class_code}': {source}")]
    InvalidRate {
        class_code: String,
        #[source]
        source: RateError,
    },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for TaxSettingsLoaderError {
    fn from(err: csv::Error) -> Self {
        TaxSettingsLoaderError::CsvParse(err.to_string())
    }
}

/// A single row of the class settings CSV file.
///
/// `class_code` is followed by one column per rate. A rate is a fraction
/// (`0.1` for 10%); an empty cell leaves the default rate in place.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TaxSettingsRecord {
    pub class_code: String,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub stock_transaction_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub real_estate_transaction_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub item_store_vat: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub auction_transaction_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub property_holding_tax_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub item_market_transaction_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub income_tax_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub transaction_tax_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub salary_tax_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub reward_tax_rate: Option<Decimal>,
}

impl TaxSettingsRecord {
    pub fn overrides(&self) -> RateOverrides {
        RateOverrides {
            stock_transaction_rate: self.stock_transaction_rate,
            real_estate_transaction_rate: self.real_estate_transaction_rate,
            item_store_vat: self.item_store_vat,
            auction_transaction_rate: self.auction_transaction_rate,
            property_holding_tax_rate: self.property_holding_tax_rate,
            item_market_transaction_rate: self.item_market_transaction_rate,
            income_tax_rate: self.income_tax_rate,
            transaction_tax_rate: self.transaction_tax_rate,
            salary_tax_rate: self.salary_tax_rate,
            reward_tax_rate: self.reward_tax_rate,
        }
    }
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Loader for per-class tax rate overrides from CSV files.
///
/// Works against any [`LedgerRepository`], so the same file can seed a
/// SQLite database or an in-memory store.
pub struct TaxSettingsLoader;

impl TaxSettingsLoader {
    /// Parse settings records from a CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<TaxSettingsRecord>, TaxSettingsLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: TaxSettingsRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Check every record before anything is written.
    pub fn validate(records: &[TaxSettingsRecord]) -> Result<(), TaxSettingsLoaderError> {
        let mut seen = HashSet::new();

        for (index, record) in records.iter().enumerate() {
            if record.class_code.is_empty() {
                // Row 1 is the header.
                return Err(TaxSettingsLoaderError::EmptyClassCode { row: index + 2 });
            }
            if !seen.insert(record.class_code.as_str()) {
                return Err(TaxSettingsLoaderError::DuplicateClass(
                    record.class_code.clone(),
                ));
            }
            rates::validate(&record.overrides()).map_err(|source| {
                TaxSettingsLoaderError::InvalidRate {
                    class_code: record.class_code.clone(),
                    source,
                }
            })?;
        }

        Ok(())
    }

    /// Write each record's overrides and make sure its class has a treasury.
    ///
    /// A class's stored settings are replaced wholesale, so loading the same
    /// file twice gives the same result. Returns the number of classes written.
    pub async fn load<R: LedgerRepository + ?Sized>(
        repo: &R,
        records: &[TaxSettingsRecord],
    ) -> Result<usize, TaxSettingsLoaderError> {
        Self::validate(records)?;

        for record in records {
            repo.save_tax_settings(&record.class_code, &record.overrides())
                .await?;
            repo.open_treasury(&record.class_code).await?;
            debug!(class_code = %record.class_code, "tax settings loaded");
        }

        info!(classes = records.len(), "class tax settings loaded");
        Ok(records.len())
    }
}
