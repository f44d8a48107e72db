mod rate_set;
mod tax_category;
mod tax_record;
mod tax_result;
mod treasury;

pub use rate_set::{RateOverrides, RateSet};
pub use tax_category::TaxCategory;
pub use tax_record::{NewTaxRecord, TaxRecord};
pub use tax_result::{IncomeTax, IncomeType, TransactionTax};
pub use treasury::{RevenueBreakdown, Treasury, TreasuryIncrement};
