use std::fmt;

use serde::{Deserialize, Serialize};

/// Every kind of tax that can flow into a class treasury.
///
/// Each variant owns exactly one revenue counter on the treasury, so the
/// set of counters a posting can touch is fixed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxCategory {
    ItemStore,
    ItemMarket,
    Stock,
    Transaction,
    Income,
    RealEstate,
    Auction,
    Property,
}

impl TaxCategory {
    pub const ALL: [TaxCategory; 8] = [
        Self::ItemStore,
        Self::ItemMarket,
        Self::Stock,
        Self::Transaction,
        Self::Income,
        Self::RealEstate,
        Self::Auction,
        Self::Property,
    ];

    /// Value stored in the `type` field of audit records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ItemStore => "item_store",
            Self::ItemMarket => "item_market",
            Self::Stock => "stock",
            Self::Transaction => "transaction",
            Self::Income => "income",
            Self::RealEstate => "real_estate",
            Self::Auction => "auction",
            Self::Property => "property",
        }
    }

    /// Name of the treasury revenue counter this category increments.
    pub fn revenue_field(&self) -> &'static str {
        match self {
            Self::ItemStore => "item_store_revenue",
            Self::ItemMarket => "item_market_revenue",
            Self::Stock => "stock_revenue",
            Self::Transaction => "transaction_revenue",
            Self::Income => "income_revenue",
            Self::RealEstate => "real_estate_revenue",
            Self::Auction => "auction_revenue",
            Self::Property => "property_revenue",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ItemStore => "Item store VAT",
            Self::ItemMarket => "Item market tax",
            Self::Stock => "Stock transaction tax",
            Self::Transaction => "Transaction tax",
            Self::Income => "Income tax",
            Self::RealEstate => "Real estate transaction tax",
            Self::Auction => "Auction transaction tax",
            Self::Property => "Property holding tax",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

impl fmt::Display for TaxCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
