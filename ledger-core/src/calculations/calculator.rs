//! Tax calculator entry points.
//!
//! Each operation resolves the class rates, takes `floor(amount × rate)` as
//! tax and, when that is positive, posts it to the class treasury. Posting
//! failures never reach the caller: the operation then reports the flow as
//! untaxed so the caller's trade, purchase or payout can still complete.
//!
//! | operation              | rate                                     | category      |
//! |------------------------|------------------------------------------|---------------|
//! | `item_tax`             | market rate or store VAT                 | `ItemMarket` / `ItemStore` |
//! | `stock_tax`            | stock transaction rate                   | `Stock`       |
//! | `transaction_tax`      | transfer/transaction rate                | `Transaction` |
//! | `income_tax`           | salary, reward or generic income rate    | `Income`      |
//! | `real_estate_tax`      | real estate transaction rate             | `RealEstate`  |
//! | `auction_tax`          | auction transaction rate                 | `Auction`     |
//! | `property_holding_tax` | property holding rate                    | `Property`    |

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::warn;

use super::common::split;
use super::rates::RateResolver;
use crate::db::LedgerRepository;
use crate::models::{IncomeTax, IncomeType, TaxCategory, TransactionTax};
use crate::treasury::{TreasuryPoster, UnitOfWork};

#[derive(Clone)]
pub struct TaxCalculator {
    rates: RateResolver,
    poster: TreasuryPoster,
}

impl TaxCalculator {
    pub fn new(repo: Arc<dyn LedgerRepository>) -> Self {
        Self::with_parts(RateResolver::new(Arc::clone(&repo)), TreasuryPoster::new(repo))
    }

    pub fn with_parts(
        rates: RateResolver,
        poster: TreasuryPoster,
    ) -> Self {
        Self { rates, poster }
    }

    pub fn rates(&self) -> &RateResolver {
        &self.rates
    }

    /// Tax on an item purchase (store) or sale (marketplace).
    pub async fn item_tax(
        &self,
        class_code: &str,
        user_id: &str,
        amount: i64,
        is_marketplace: bool,
        unit: UnitOfWork<'_>,
    ) -> TransactionTax {
        let rates = self.rates.get_rates(class_code).await;
        let (category, rate, context) = if is_marketplace {
            (TaxCategory::ItemMarket, rates.item_market_transaction_rate, "marketplace sale")
        } else {
            (TaxCategory::ItemStore, rates.item_store_vat, "store purchase")
        };
        let description = format!("{}: {context} of {amount} by {user_id}", category.label());

        self.apply(class_code, category, amount, rate, &description, unit)
            .await
    }

    /// Tax on a stock trade. `transaction_type` (e.g. "buy", "sell") only
    /// labels the audit record.
    pub async fn stock_tax(
        &self,
        class_code: &str,
        user_id: &str,
        amount: i64,
        transaction_type: &str,
        unit: UnitOfWork<'_>,
    ) -> TransactionTax {
        let rate = self.rates.get_rates(class_code).await.stock_transaction_rate;
        let description = describe(TaxCategory::Stock, transaction_type, amount, user_id);

        self.apply(class_code, TaxCategory::Stock, amount, rate, &description, unit)
            .await
    }

    /// Tax on a transfer between users or any other generic transaction.
    pub async fn transaction_tax(
        &self,
        class_code: &str,
        user_id: &str,
        amount: i64,
        transaction_type: &str,
        unit: UnitOfWork<'_>,
    ) -> TransactionTax {
        let rate = self.rates.get_rates(class_code).await.transaction_tax_rate;
        let description = describe(TaxCategory::Transaction, transaction_type, amount, user_id);

        self.apply(class_code, TaxCategory::Transaction, amount, rate, &description, unit)
            .await
    }

    /// Tax withheld from an income payment.
    pub async fn income_tax(
        &self,
        class_code: &str,
        user_id: &str,
        income: i64,
        income_type: IncomeType,
        unit: UnitOfWork<'_>,
    ) -> IncomeTax {
        let rates = self.rates.get_rates(class_code).await;
        let rate = match income_type {
            IncomeType::Salary => rates.salary_tax_rate,
            IncomeType::Reward => rates.reward_tax_rate,
            IncomeType::General => rates.income_tax_rate,
        };
        let description = describe(TaxCategory::Income, income_type.as_str(), income, user_id);

        let split = self
            .apply(class_code, TaxCategory::Income, income, rate, &description, unit)
            .await;
        IncomeTax {
            gross_income: split.original_amount,
            tax_amount: split.tax_amount,
            net_income: split.net_amount,
        }
    }

    pub async fn real_estate_tax(
        &self,
        class_code: &str,
        user_id: &str,
        amount: i64,
        transaction_type: &str,
        unit: UnitOfWork<'_>,
    ) -> TransactionTax {
        let rate = self
            .rates
            .get_rates(class_code)
            .await
            .real_estate_transaction_rate;
        let description = describe(TaxCategory::RealEstate, transaction_type, amount, user_id);

        self.apply(class_code, TaxCategory::RealEstate, amount, rate, &description, unit)
            .await
    }

    pub async fn auction_tax(
        &self,
        class_code: &str,
        user_id: &str,
        amount: i64,
        transaction_type: &str,
        unit: UnitOfWork<'_>,
    ) -> TransactionTax {
        let rate = self.rates.get_rates(class_code).await.auction_transaction_rate;
        let description = describe(TaxCategory::Auction, transaction_type, amount, user_id);

        self.apply(class_code, TaxCategory::Auction, amount, rate, &description, unit)
            .await
    }

    /// Periodic tax on the assessed value of property a user holds.
    pub async fn property_holding_tax(
        &self,
        class_code: &str,
        user_id: &str,
        assessed_value: i64,
        unit: UnitOfWork<'_>,
    ) -> TransactionTax {
        let rate = self.rates.get_rates(class_code).await.property_holding_tax_rate;
        let description = describe(TaxCategory::Property, "holding", assessed_value, user_id);

        self.apply(class_code, TaxCategory::Property, assessed_value, rate, &description, unit)
            .await
    }

    async fn apply(
        &self,
        class_code: &str,
        category: TaxCategory,
        amount: i64,
        rate: Decimal,
        description: &str,
        unit: UnitOfWork<'_>,
    ) -> TransactionTax {
        let (tax_amount, net_amount) = split(amount, rate);
        if tax_amount <= 0 {
            return TransactionTax::untaxed(amount);
        }

        if !self
            .poster
            .post(class_code, category, tax_amount, description, unit)
            .await
        {
            warn!(class_code, %category, amount, tax_amount, "tax not applied");
            return TransactionTax::untaxed(amount);
        }

        TransactionTax {
            original_amount: amount,
            tax_amount,
            net_amount,
        }
    }
}

fn describe(
    category: TaxCategory,
    context: &str,
    amount: i64,
    user_id: &str,
) -> String {
    if context.is_empty() {
        format!("{}: {amount} by {user_id}", category.label())
    } else {
        format!("{} ({context}): {amount} by {user_id}", category.label())
    }
}
