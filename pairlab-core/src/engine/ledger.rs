//! Portfolio ledger — cash, open leg quantities, equity curve, round trips.
//!
//! The accounting identity `equity == cash + Σ quantity × price` holds at every
//! mark. Quantities live in a `BTreeMap` so the position value is always summed
//! in the same leg order.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Fill, Leg, PairBar, PairTrade, SpreadDirection};

use super::execution::FillPair;

/// Equity at one bar's close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Entry side of a round trip that has not closed yet.
#[derive(Debug, Clone)]
struct OpenTrade {
    direction: SpreadDirection,
    entry_bar: usize,
    entry_fills: FillPair,
    cash_before: f64,
}

#[derive(Debug, Clone)]
pub struct PortfolioLedger {
    cash: f64,
    open_quantities: BTreeMap<Leg, f64>,
    equity_curve: Vec<EquityPoint>,
    trades: Vec<PairTrade>,
    open_trade: Option<OpenTrade>,
}

impl PortfolioLedger {
    pub fn new(initial_cash: f64) -> Self {
        Self::with_capacity(initial_cash, 0)
    }

    /// Ledger with room for `bars` equity points.
    pub fn with_capacity(initial_cash: f64, bars: usize) -> Self {
        Self {
            cash: initial_cash,
            open_quantities: BTreeMap::new(),
            equity_curve: Vec::with_capacity(bars),
            trades: Vec::new(),
            open_trade: None,
        }
    }

    /// Apply fills to cash and open quantities.
    pub fn apply(&mut self, fills: &[Fill]) {
        for fill in fills {
            self.cash += fill.cash_flow();
            *self.open_quantities.entry(fill.leg).or_insert(0.0) += fill.quantity;
        }
    }

    /// Apply an opening pair and remember it for the round-trip record.
    pub fn open_trade(&mut self, direction: SpreadDirection, bar_index: usize, fills: FillPair) {
        debug_assert!(self.open_trade.is_none(), "pair position already open");
        let cash_before = self.cash;
        self.apply(&fills);
        self.open_trade = Some(OpenTrade {
            direction,
            entry_bar: bar_index,
            entry_fills: fills,
            cash_before,
        });
    }

    /// Apply a closing pair and record the completed round trip.
    pub fn close_trade(&mut self, bar_index: usize, fills: FillPair) -> Option<&PairTrade> {
        self.apply(&fills);
        let open = self.open_trade.take()?;
        self.trades.push(PairTrade {
            direction: open.direction,
            entry_date: open.entry_fills[0].date,
            exit_date: fills[0].date,
            bars_held: bar_index - open.entry_bar,
            entry_fills: open.entry_fills,
            exit_fills: fills,
            pnl: self.cash - open.cash_before,
        });
        self.trades.last()
    }

    /// Value cash plus open quantities at `bar`'s closes, without recording.
    pub fn equity_at(&self, bar: &PairBar) -> f64 {
        let position_value: f64 = self
            .open_quantities
            .iter()
            .map(|(&leg, &qty)| qty * bar.price(leg))
            .sum();
        self.cash + position_value
    }

    /// Mark to market at `bar` and append the result to the equity curve.
    ///
    /// Called exactly once per bar, whether or not anything traded.
    pub fn mark(&mut self, bar: &PairBar) -> f64 {
        let equity = self.equity_at(bar);
        self.equity_curve.push(EquityPoint {
            date: bar.date,
            equity,
        });
        equity
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn quantity(&self, leg: Leg) -> f64 {
        self.open_quantities.get(&leg).copied().unwrap_or(0.0)
    }

    pub fn open_quantities(&self) -> &BTreeMap<Leg, f64> {
        &self.open_quantities
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn trades(&self) -> &[PairTrade] {
        &self.trades
    }

    /// Split into the recorded equity curve, trades and open quantities.
    pub fn into_parts(self) -> (Vec<EquityPoint>, Vec<PairTrade>, BTreeMap<Leg, f64>) {
        (self.equity_curve, self.trades, self.open_quantities)
    }
}
