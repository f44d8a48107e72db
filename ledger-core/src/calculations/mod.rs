//! Tax calculation for the classroom economy.
//!
//! [`common`] holds the split arithmetic, [`rates`] resolves per-class rates
//! and [`calculator`] ties both to treasury posting.

pub mod calculator;
pub mod common;
pub mod rates;

pub use calculator::TaxCalculator;
pub use rates::{RateError, RateResolver};
