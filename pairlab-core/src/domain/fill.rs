use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::leg::Leg;

/// Synthetic execution of one leg at the bar's close.
///
/// `quantity` is signed: positive buys, negative sells. Fills are always
/// produced in pairs (one per leg) by the execution simulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub date: NaiveDate,
    pub leg: Leg,
    pub quantity: f64,
    pub price: f64,
}

impl Fill {
    /// Cash impact of the fill: buying spends cash, selling raises it.
    pub fn cash_flow(&self) -> f64 {
        -self.quantity * self.price
    }

    pub fn notional(&self) -> f64 {
        self.quantity.abs() * self.price
    }

    pub fn is_buy(&self) -> bool {
        self.quantity > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(quantity: f64) -> Fill {
        Fill {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            leg: Leg::A,
            quantity,
            price: 20.0,
        }
    }

    #[test]
    fn buy_spends_cash() {
        let f = fill(5.0);
        assert!(f.is_buy());
        assert_eq!(f.cash_flow(), -100.0);
        assert_eq!(f.notional(), 100.0);
    }

    #[test]
    fn sell_raises_cash() {
        let f = fill(-5.0);
        assert!(!f.is_buy());
        assert_eq!(f.cash_flow(), 100.0);
        assert_eq!(f.notional(), 100.0);
    }
}
