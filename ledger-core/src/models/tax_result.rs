use std::fmt;

use serde::{Deserialize, Serialize};

/// Split of a transaction-style flow into tax and the amount left to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionTax {
    pub original_amount: i64,
    pub tax_amount: i64,
    pub net_amount: i64,
}

impl TransactionTax {
    /// The result reported when no tax ended up being applied.
    pub fn untaxed(amount: i64) -> Self {
        Self {
            original_amount: amount,
            tax_amount: 0,
            net_amount: amount,
        }
    }
}

impl fmt::Display for TransactionTax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "original {} / tax {} / net {}",
            self.original_amount, self.tax_amount, self.net_amount
        )
    }
}

/// Split of an income payment into tax and take-home income.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeTax {
    pub gross_income: i64,
    pub tax_amount: i64,
    pub net_income: i64,
}

impl IncomeTax {
    pub fn untaxed(income: i64) -> Self {
        Self {
            gross_income: income,
            tax_amount: 0,
            net_income: income,
        }
    }
}

impl fmt::Display for IncomeTax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gross {} / tax {} / net {}",
            self.gross_income, self.tax_amount, self.net_income
        )
    }
}

/// Which income rate applies to a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeType {
    Salary,
    Reward,
    #[default]
    General,
}

impl IncomeType {
    /// Maps a free-text label; anything other than salary or reward is general income.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "salary" => Self::Salary,
            "reward" => Self::Reward,
            _ => Self::General,
        }
    }

    pub fn from_label(label: Option<&str>) -> Self {
        label.map(Self::parse).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Salary => "salary",
            Self::Reward => "reward",
            Self::General => "general",
        }
    }
}
