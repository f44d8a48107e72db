use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// A fully populated set of class tax rates, each a fraction in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSet {
    pub stock_transaction_rate: Decimal,
    pub real_estate_transaction_rate: Decimal,
    pub item_store_vat: Decimal,
    pub auction_transaction_rate: Decimal,
    pub property_holding_tax_rate: Decimal,
    pub item_market_transaction_rate: Decimal,
    pub income_tax_rate: Decimal,
    pub transaction_tax_rate: Decimal,
    pub salary_tax_rate: Decimal,
    pub reward_tax_rate: Decimal,
}

impl RateSet {
    /// Built-in rates used for every field a class has not configured.
    pub const DEFAULT: RateSet = RateSet {
        stock_transaction_rate: dec!(0.01),
        real_estate_transaction_rate: dec!(0.03),
        item_store_vat: dec!(0.1),
        auction_transaction_rate: dec!(0.03),
        property_holding_tax_rate: dec!(0.002),
        item_market_transaction_rate: dec!(0.03),
        income_tax_rate: dec!(0.1),
        transaction_tax_rate: dec!(0.005),
        salary_tax_rate: dec!(0.1),
        reward_tax_rate: dec!(0.05),
    };
}

impl Default for RateSet {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for RateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "stock transaction       {}", self.stock_transaction_rate)?;
        writeln!(f, "real estate transaction {}", self.real_estate_transaction_rate)?;
        writeln!(f, "item store VAT          {}", self.item_store_vat)?;
        writeln!(f, "auction transaction     {}", self.auction_transaction_rate)?;
        writeln!(f, "property holding        {}", self.property_holding_tax_rate)?;
        writeln!(f, "item market transaction {}", self.item_market_transaction_rate)?;
        writeln!(f, "income                  {}", self.income_tax_rate)?;
        writeln!(f, "transaction             {}", self.transaction_tax_rate)?;
        writeln!(f, "salary                  {}", self.salary_tax_rate)?;
        write!(f, "reward                  {}", self.reward_tax_rate)
    }
}

/// Rates a class has explicitly configured. `None` means "use the default".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateOverrides {
    pub stock_transaction_rate: Option<Decimal>,
    pub real_estate_transaction_rate: Option<Decimal>,
    pub item_store_vat: Option<Decimal>,
    pub auction_transaction_rate: Option<Decimal>,
    pub property_holding_tax_rate: Option<Decimal>,
    pub item_market_transaction_rate: Option<Decimal>,
    pub income_tax_rate: Option<Decimal>,
    pub transaction_tax_rate: Option<Decimal>,
    pub salary_tax_rate: Option<Decimal>,
    pub reward_tax_rate: Option<Decimal>,
}

impl RateOverrides {
    /// Every configured rate paired with its field name.
    pub fn entries(&self) -> [(&'static str, Option<Decimal>); 10] {
        [
            ("stock_transaction_rate", self.stock_transaction_rate),
            ("real_estate_transaction_rate", self.real_estate_transaction_rate),
            ("item_store_vat", self.item_store_vat),
            ("auction_transaction_rate", self.auction_transaction_rate),
            ("property_holding_tax_rate", self.property_holding_tax_rate),
            ("item_market_transaction_rate", self.item_market_transaction_rate),
            ("income_tax_rate", self.income_tax_rate),
            ("transaction_tax_rate", self.transaction_tax_rate),
            ("salary_tax_rate", self.salary_tax_rate),
            ("reward_tax_rate", self.reward_tax_rate),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.entries().iter().all(|(_, rate)| rate.is_none())
    }
}
