//! Per-ticker position bookkeeping.

use super::trade::{Operation, Trade};

/// Quantity held and net cash invested for one ticker. Quantity may go
/// negative (short); no holdings check is made on sells.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub ticker: String,
    pub quantity: i64,
    pub cash_flow: f64,
}

impl Position {
    pub fn new(ticker: &str) -> Self {
        Position {
            ticker: ticker.to_string(),
            quantity: 0,
            cash_flow: 0.0,
        }
    }

    pub fn is_long(&self) -> bool {
        self.quantity > 0
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0
    }

    pub fn is_flat(&self) -> bool {
        self.quantity == 0
    }

    /// Signed mark-to-market value; shorts contribute negative value.
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity as f64 * price
    }

    pub fn apply(&mut self, trade: &Trade) {
        match trade.operation {
            Operation::Buy => {
                self.quantity += trade.quantity;
                self.cash_flow -= trade.notional() + trade.fee;
            }
            Operation::Sell => {
                self.quantity -= trade.quantity;
                self.cash_flow += trade.notional() - trade.fee;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn trade(operation: Operation, price: f64, quantity: i64, fee: f64) -> Trade {
        Trade {
            ticker: "GAZP".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            price,
            quantity,
            fee,
            operation,
        }
    }

    #[test]
    fn new_position_is_flat() {
        let pos = Position::new("GAZP");
        assert!(pos.is_flat());
        assert_eq!(pos.cash_flow, 0.0);
    }

    #[test]
    fn buy_increases_quantity_and_spends_cash() {
        let mut pos = Position::new("GAZP");
        pos.apply(&trade(Operation::Buy, 150.0, 10, 5.0));
        assert_eq!(pos.quantity, 10);
        assert!((pos.cash_flow - (-1505.0)).abs() < f64::EPSILON);
        assert!(pos.is_long());
    }

    #[test]
    fn sell_decreases_quantity_and_receives_cash() {
        let mut pos = Position::new("GAZP");
        pos.apply(&trade(Operation::Buy, 150.0, 10, 5.0));
        pos.apply(&trade(Operation::Sell, 160.0, 4, 2.0));
        assert_eq!(pos.quantity, 6);
        // -1505 + (640 - 2)
        assert!((pos.cash_flow - (-867.0)).abs() < 1e-9);
    }

    #[test]
    fn selling_more_than_held_goes_short() {
        let mut pos = Position::new("GAZP");
        pos.apply(&trade(Operation::Sell, 100.0, 3, 0.0));
        assert_eq!(pos.quantity, -3);
        assert!(pos.is_short());
        assert!((pos.cash_flow - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn market_value_short_is_negative() {
        let pos = Position {
            ticker: "GAZP".into(),
            quantity: -5,
            cash_flow: 0.0,
        };
        assert!((pos.market_value(20.0) - (-100.0)).abs() < f64::EPSILON);
    }
}
