//! Run fingerprinting — deterministic identification of a simulation input.
//!
//! A `RunFingerprint` is a BLAKE3 digest over the simulation parameters and
//! the exact bit patterns of every bar. Two runs with the same fingerprint
//! replay the same inputs, and the loop is deterministic, so they must
//! produce bit-identical results.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::PairBar;
use crate::engine::SimulationParams;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunFingerprint(pub String);

impl RunFingerprint {
    pub fn compute(params: &SimulationParams, bars: &[PairBar]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(params.lookback as u64).to_le_bytes());
        hasher.update(&params.entry_z.to_bits().to_le_bytes());
        hasher.update(&params.exit_z.to_bits().to_le_bytes());
        hasher.update(&params.notional_per_leg.to_bits().to_le_bytes());
        hasher.update(&params.annualization_factor.to_le_bytes());
        hasher.update(&params.initial_cash.to_bits().to_le_bytes());

        hasher.update(&(bars.len() as u64).to_le_bytes());
        for bar in bars {
            hasher.update(bar.date.to_string().as_bytes());
            hasher.update(&bar.price_a.to_bits().to_le_bytes());
            hasher.update(&bar.price_b.to_bits().to_le_bytes());
        }
        Self(hasher.finalize().to_hex().to_string())
    }

    /// First 12 hex characters, for logs.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for RunFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::test_bars;

    #[test]
    fn fingerprint_is_deterministic() {
        let bars = test_bars(&[(10.0, 11.0), (10.5, 11.2)]);
        let params = SimulationParams::default();
        assert_eq!(
            RunFingerprint::compute(&params, &bars),
            RunFingerprint::compute(&params, &bars)
        );
    }

    #[test]
    fn fingerprint_changes_with_params() {
        let bars = test_bars(&[(10.0, 11.0), (10.5, 11.2)]);
        let a = RunFingerprint::compute(&SimulationParams::default(), &bars);
        let b = RunFingerprint::compute(
            &SimulationParams {
                entry_z: 2.5,
                ..Default::default()
            },
            &bars,
        );
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_changes_with_data() {
        let params = SimulationParams::default();
        let a = RunFingerprint::compute(&params, &test_bars(&[(10.0, 11.0)]));
        let b = RunFingerprint::compute(&params, &test_bars(&[(10.0, 11.000001)]));
        assert_ne!(a, b);
    }

    #[test]
    fn short_form_is_prefix() {
        let fp = RunFingerprint::compute(&SimulationParams::default(), &[]);
        assert_eq!(fp.0.len(), 64);
        assert!(fp.0.starts_with(fp.short()));
        assert_eq!(fp.short().len(), 12);
    }
}
