//! Rate columns are SQLite `REAL`s; the ledger works with exact decimals.

use ledger_core::RepositoryError;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

/// Read a nullable rate column. NULL means the class keeps the default.
pub fn get_rate(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<Decimal>, RepositoryError> {
    let stored: Option<f64> = row.try_get(column).map_err(|e| {
        RepositoryError::Database(format!("cannot read rate column '{column}': {e}"))
    })?;

    stored
        .map(|value| {
            Decimal::try_from(value).map_err(|e| {
                RepositoryError::Database(format!("rate {value} in '{column}' is not a decimal: {e}"))
            })
        })
        .transpose()
}

pub fn rate_to_f64(rate: Decimal) -> f64 {
    rate.to_f64().unwrap_or(0.0)
}
