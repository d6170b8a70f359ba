//! Trade ledger entries.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Buy,
    Sell,
}

impl Operation {
    /// +1 for money entering the portfolio, -1 for money leaving it.
    pub fn sign(&self) -> f64 {
        match self {
            Operation::Buy => 1.0,
            Operation::Sell => -1.0,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Buy => write!(f, "BUY"),
            Operation::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Operation::Buy),
            "SELL" => Ok(Operation::Sell),
            other => Err(format!("unknown operation {other}")),
        }
    }
}

/// A single executed trade. `quantity` is always a positive magnitude;
/// direction comes from `operation`.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub ticker: String,
    pub date: NaiveDate,
    pub price: f64,
    pub quantity: i64,
    pub fee: f64,
    pub operation: Operation,
}

impl Trade {
    /// Gross traded amount, excluding the fee.
    pub fn notional(&self) -> f64 {
        self.price * self.quantity as f64
    }
}
