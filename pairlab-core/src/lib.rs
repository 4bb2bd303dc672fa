//! PairLab Core — engine and domain types for pair-trading backtests.
//!
//! This crate contains the simulation itself:
//! - Domain types (pair bars, legs, fills, position states, round trips)
//! - Rolling log-spread window and z-score signal
//! - Position state machine (flat / long spread / short spread)
//! - Execution simulator (fills at the close, equal notional per leg)
//! - Portfolio ledger (cash, quantities, equity curve)
//! - Bar-by-bar simulation loop
//! - Run fingerprinting and a seeded synthetic pair generator

pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod signals;
pub mod synthetic;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: result and config types can cross threads.
    ///
    /// The parameter sweep runs simulations on a rayon pool and ships results
    /// back; if any of these stops being Send + Sync the build breaks here.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::PairBar>();
        require_sync::<domain::PairBar>();
        require_send::<domain::Fill>();
        require_sync::<domain::Fill>();
        require_send::<domain::PairTrade>();
        require_sync::<domain::PairTrade>();

        require_send::<engine::SimulationConfig>();
        require_sync::<engine::SimulationConfig>();
        require_send::<engine::SimulationResult>();
        require_sync::<engine::SimulationResult>();

        require_send::<signals::SpreadSignalGenerator>();
        require_send::<fingerprint::RunFingerprint>();
        require_sync::<fingerprint::RunFingerprint>();
    }

    /// Architecture contract: signal sources never see portfolio state.
    ///
    /// `SignalSource::update` takes only the bar. If a position or ledger
    /// parameter is ever added, this stops compiling.
    #[test]
    fn signal_source_has_no_portfolio_parameter() {
        fn _check_trait_object_builds(
            sig: &mut dyn signals::SignalSource,
            bar: &domain::PairBar,
        ) -> Option<f64> {
            sig.update(bar)
        }
    }
}
