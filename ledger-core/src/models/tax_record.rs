use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TaxCategory;

/// Append-only audit entry for one standalone tax posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRecord {
    pub id: i64,
    pub class_code: String,
    #[serde(rename = "type")]
    pub category: TaxCategory,
    pub amount: i64,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

/// For appending new records (the store assigns id and timestamp)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTaxRecord {
    pub class_code: String,
    #[serde(rename = "type")]
    pub category: TaxCategory,
    pub amount: i64,
    pub description: String,
}
