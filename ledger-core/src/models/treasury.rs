use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TaxCategory;

/// Cumulative tax revenue per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueBreakdown {
    pub item_store: i64,
    pub item_market: i64,
    pub stock: i64,
    pub transaction: i64,
    pub income: i64,
    pub real_estate: i64,
    pub auction: i64,
    pub property: i64,
}

impl RevenueBreakdown {
    pub fn get(&self, category: TaxCategory) -> i64 {
        match category {
            TaxCategory::ItemStore => self.item_store,
            TaxCategory::ItemMarket => self.item_market,
            TaxCategory::Stock => self.stock,
            TaxCategory::Transaction => self.transaction,
            TaxCategory::Income => self.income,
            TaxCategory::RealEstate => self.real_estate,
            TaxCategory::Auction => self.auction,
            TaxCategory::Property => self.property,
        }
    }

    pub fn add(&mut self, category: TaxCategory, amount: i64) {
        let counter = match category {
            TaxCategory::ItemStore => &mut self.item_store,
            TaxCategory::ItemMarket => &mut self.item_market,
            TaxCategory::Stock => &mut self.stock,
            TaxCategory::Transaction => &mut self.transaction,
            TaxCategory::Income => &mut self.income,
            TaxCategory::RealEstate => &mut self.real_estate,
            TaxCategory::Auction => &mut self.auction,
            TaxCategory::Property => &mut self.property,
        };
        *counter += amount;
    }

    pub fn total(&self) -> i64 {
        TaxCategory::ALL.iter().map(|c| self.get(*c)).sum()
    }
}

/// The class-wide pool that accumulates tax revenue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treasury {
    pub class_code: String,
    pub total_amount: i64,
    pub revenue: RevenueBreakdown,
    pub last_updated: DateTime<Utc>,
}

impl Treasury {
    /// An empty treasury for a class that has collected nothing yet.
    pub fn new(class_code: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            class_code: class_code.into(),
            total_amount: 0,
            revenue: RevenueBreakdown::default(),
            last_updated: now,
        }
    }

    /// Applies one increment in memory, mirroring what a backend does in storage.
    pub fn apply(&mut self, increment: &TreasuryIncrement) {
        self.total_amount += increment.amount;
        self.revenue.add(increment.category, increment.amount);
        self.last_updated = increment.at;
    }

    /// `total_amount` matches the sum of the revenue counters.
    pub fn is_balanced(&self) -> bool {
        self.total_amount == self.revenue.total()
    }
}

impl fmt::Display for Treasury {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "treasury {} (updated {})", self.class_code, self.last_updated)?;
        writeln!(f, "  total {:>12}", self.total_amount)?;
        for category in TaxCategory::ALL {
            writeln!(f, "  {:<12} {:>12}", category.as_str(), self.revenue.get(category))?;
        }
        Ok(())
    }
}

/// One atomic increment of a treasury's balance and a single revenue counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreasuryIncrement {
    pub class_code: String,
    pub category: TaxCategory,
    pub amount: i64,
    pub at: DateTime<Utc>,
}
