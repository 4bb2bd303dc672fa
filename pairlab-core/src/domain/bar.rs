//! PairBar — one trading day of closing prices for both legs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::leg::Leg;

/// Reasons a bar cannot enter the simulation loop.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("{leg} price {price} on {date} is not a finite positive number")]
    InvalidPrice {
        date: NaiveDate,
        leg: Leg,
        price: f64,
    },
}

/// Aligned closing prices for the two paired assets on a single date.
///
/// Produced by the loader after joining the two series on date. Both prices
/// must be finite and strictly positive so the log-spread is defined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairBar {
    pub date: NaiveDate,
    pub price_a: f64,
    pub price_b: f64,
}

impl PairBar {
    pub fn new(date: NaiveDate, price_a: f64, price_b: f64) -> Self {
        Self {
            date,
            price_a,
            price_b,
        }
    }

    /// Closing price of the given leg.
    pub fn price(&self, leg: Leg) -> f64 {
        match leg {
            Leg::A => self.price_a,
            Leg::B => self.price_b,
        }
    }

    /// Log-spread `ln(price_a) - ln(price_b)`.
    pub fn log_spread(&self) -> f64 {
        self.price_a.ln() - self.price_b.ln()
    }

    pub fn validate(&self) -> Result<(), BarError> {
        for leg in Leg::ALL {
            let price = self.price(leg);
            if !(price.is_finite() && price > 0.0) {
                return Err(BarError::InvalidPrice {
                    date: self.date,
                    leg,
                    price,
                });
            }
        }
        Ok(())
    }
}
