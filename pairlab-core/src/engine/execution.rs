//! Execution simulator — turns a transition into a matched pair of fills.
//!
//! Every fill happens in full at the current bar's close: no slippage, no
//! partial fills, no liquidity limit. A pair is returned as `[Fill; 2]`, so
//! a half-executed pair cannot be represented.

use std::collections::BTreeMap;

use crate::domain::{Fill, Leg, PairBar, SpreadDirection, Transition};

/// One fill per leg, `[A, B]`.
pub type FillPair = [Fill; 2];

#[derive(Debug, Clone, Copy)]
pub struct ExecutionSimulator {
    notional_per_leg: f64,
}

impl ExecutionSimulator {
    pub fn new(notional_per_leg: f64) -> Self {
        Self { notional_per_leg }
    }

    /// Fills for `transition` at `bar`'s closing prices.
    ///
    /// `open_quantities` is only consulted on exit: each closing fill is the
    /// exact negation of the open quantity, so the position nets to zero.
    pub fn execute(
        &self,
        transition: Transition,
        bar: &PairBar,
        open_quantities: &BTreeMap<Leg, f64>,
    ) -> FillPair {
        match transition {
            Transition::Enter(direction) => self.open(direction, bar),
            Transition::Exit => Self::close(bar, open_quantities),
        }
    }

    /// Equal notional per leg; quantity = notional / price at that leg's price.
    fn open(&self, direction: SpreadDirection, bar: &PairBar) -> FillPair {
        let sign_a = direction.leg_a_sign();
        Leg::ALL.map(|leg| {
            let sign = if leg == Leg::A { sign_a } else { -sign_a };
            let price = bar.price(leg);
            Fill {
                date: bar.date,
                leg,
                quantity: sign * self.notional_per_leg / price,
                price,
            }
        })
    }

    fn close(bar: &PairBar, open_quantities: &BTreeMap<Leg, f64>) -> FillPair {
        Leg::ALL.map(|leg| Fill {
            date: bar.date,
            leg,
            quantity: -open_quantities.get(&leg).copied().unwrap_or(0.0),
            price: bar.price(leg),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(price_a: f64, price_b: f64) -> PairBar {
        PairBar::new(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), price_a, price_b)
    }

    #[test]
    fn long_spread_buys_a_sells_b() {
        let sim = ExecutionSimulator::new(1_000.0);
        let fills = sim.execute(
            Transition::Enter(SpreadDirection::Long),
            &bar(50.0, 20.0),
            &BTreeMap::new(),
        );
        assert_eq!(fills[0].leg, Leg::A);
        assert_eq!(fills[0].quantity, 20.0);
        assert_eq!(fills[0].price, 50.0);
        assert_eq!(fills[1].leg, Leg::B);
        assert_eq!(fills[1].quantity, -50.0);
        assert_eq!(fills[1].price, 20.0);
    }

    #[test]
    fn short_spread_sells_a_buys_b() {
        let sim = ExecutionSimulator::new(1_000.0);
        let fills = sim.execute(
            Transition::Enter(SpreadDirection::Short),
            &bar(50.0, 20.0),
            &BTreeMap::new(),
        );
        assert_eq!(fills[0].quantity, -20.0);
        assert_eq!(fills[1].quantity, 50.0);
    }

    #[test]
    fn legs_have_equal_notional_not_equal_quantity() {
        let sim = ExecutionSimulator::new(7_500.0);
        let fills = sim.execute(
            Transition::Enter(SpreadDirection::Long),
            &bar(123.45, 6.78),
            &BTreeMap::new(),
        );
        assert!((fills[0].notional() - 7_500.0).abs() < 1e-9);
        assert!((fills[1].notional() - 7_500.0).abs() < 1e-9);
        assert_ne!(fills[0].quantity.abs(), fills[1].quantity.abs());
    }

    #[test]
    fn exit_negates_open_quantities() {
        let sim = ExecutionSimulator::new(1_000.0);
        let open = BTreeMap::from([(Leg::A, -20.0), (Leg::B, 50.0)]);
        let fills = sim.execute(Transition::Exit, &bar(48.0, 21.0), &open);
        assert_eq!(fills[0].quantity, 20.0);
        assert_eq!(fills[0].price, 48.0);
        assert_eq!(fills[1].quantity, -50.0);
        assert_eq!(fills[1].price, 21.0);
    }
}
