//! Bar-by-bar simulation loop — the heart of the engine.
//!
//! Fixed order per bar:
//! 1. Signal: feed the bar to the signal source, get a z-score or nothing
//! 2. Transition: evaluate the position state machine (exit before entry)
//! 3. Fills: execute the transition as a fill pair, apply to the ledger
//! 4. Mark: value the portfolio at the bar's closes, append to equity curve

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{BarError, Leg, PairBar, Transition};
use crate::signals::{SignalSource, SpreadSignalGenerator};

use super::config::SimulationConfig;
use super::execution::ExecutionSimulator;
use super::state::{BarRecord, SimulationResult, SimulationState};

/// Precondition violations in the bar sequence handed to the loop.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("bar {index} is malformed: {source}")]
    MalformedBar {
        index: usize,
        #[source]
        source: BarError,
    },
    #[error("bar {index} dated {current} does not follow {previous}")]
    NonIncreasingDate {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },
}

/// Check that every bar has valid prices and dates strictly increase.
pub fn validate_bars(bars: &[PairBar]) -> Result<(), SimulationError> {
    let mut previous: Option<NaiveDate> = None;
    for (index, bar) in bars.iter().enumerate() {
        bar.validate()
            .map_err(|source| SimulationError::MalformedBar { index, source })?;
        if let Some(prev) = previous {
            if bar.date <= prev {
                return Err(SimulationError::NonIncreasingDate {
                    index,
                    previous: prev,
                    current: bar.date,
                });
            }
        }
        previous = Some(bar.date);
    }
    Ok(())
}

/// Run the pair strategy over `bars` with the rolling spread z-score.
pub fn run_simulation(
    bars: &[PairBar],
    config: &SimulationConfig,
) -> Result<SimulationResult, SimulationError> {
    let mut signal = SpreadSignalGenerator::new(config.lookback());
    run_with_signal(bars, config, &mut signal)
}

/// Run the loop with an arbitrary signal source.
///
/// The source is fed every bar exactly once, in order.
pub fn run_with_signal(
    bars: &[PairBar],
    config: &SimulationConfig,
    signal: &mut dyn SignalSource,
) -> Result<SimulationResult, SimulationError> {
    validate_bars(bars)?;

    let thresholds = config.thresholds();
    let execution = ExecutionSimulator::new(config.notional_per_leg());
    let mut state = SimulationState::new(config.initial_cash(), bars.len());
    let mut fills = Vec::new();
    let mut bar_log = Vec::with_capacity(bars.len());

    for (t, bar) in bars.iter().enumerate() {
        // ─── Signal ───
        let zscore = signal.update(bar);

        // ─── Transition + fills ───
        if let Some(transition) = state.position.transition(zscore, &thresholds) {
            let pair = execution.execute(transition, bar, state.ledger.open_quantities());
            match transition {
                Transition::Enter(direction) => {
                    debug!(date = %bar.date, z = ?zscore, %direction, "enter pair position");
                    state.ledger.open_trade(direction, t, pair);
                }
                Transition::Exit => {
                    let pnl = state.ledger.close_trade(t, pair).map(|trade| trade.pnl);
                    debug!(date = %bar.date, z = ?zscore, pnl = ?pnl, "exit pair position");
                }
            }
            state.position = state.position.apply(transition);
            fills.extend(pair);
        }

        // ─── Mark ───
        let equity = state.ledger.mark(bar);
        let drawdown = state.drawdown(equity);
        bar_log.push(BarRecord {
            date: bar.date,
            spread: bar.log_spread(),
            zscore,
            position: state.position,
            cash: state.ledger.cash(),
            qty_a: state.ledger.quantity(Leg::A),
            qty_b: state.ledger.quantity(Leg::B),
            equity,
            drawdown,
        });
    }

    let final_cash = state.ledger.cash();
    let (equity_curve, trades, open_quantities) = state.ledger.into_parts();

    info!(
        signal = signal.name(),
        bars = bars.len(),
        fills = fills.len(),
        trades = trades.len(),
        final_equity = equity_curve.last().map(|p| p.equity).unwrap_or(final_cash),
        "simulation complete"
    );

    Ok(SimulationResult {
        equity_curve,
        fills,
        trades,
        bar_log,
        initial_cash: config.initial_cash(),
        final_cash,
        final_position: state.position,
        open_quantities,
        bar_count: bars.len(),
        warmup_bars: signal.warmup_bars().min(bars.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PositionState;
    use crate::engine::SimulationParams;
    use crate::signals::{test_bars, ScriptedSignal};

    fn config(lookback: usize) -> SimulationConfig {
        SimulationConfig::new(SimulationParams {
            lookback,
            entry_z: 2.0,
            exit_z: 0.5,
            notional_per_leg: 1_000.0,
            annualization_factor: 252,
            initial_cash: 10_000.0,
        })
        .unwrap()
    }

    #[test]
    fn empty_input_yields_empty_curve() {
        let result = run_simulation(&[], &config(3)).unwrap();
        assert!(result.equity_curve.is_empty());
        assert_eq!(result.final_equity(), 10_000.0);
    }

    #[test]
    fn one_equity_point_per_bar() {
        let bars = test_bars(&[(10.0, 10.0), (11.0, 10.5), (10.5, 10.0), (12.0, 9.0)]);
        let result = run_simulation(&bars, &config(2)).unwrap();
        assert_eq!(result.equity_curve.len(), bars.len());
        assert_eq!(result.bar_log.len(), bars.len());
        assert_eq!(result.equity_curve[0].equity, 10_000.0);
    }

    #[test]
    fn rejects_non_increasing_dates() {
        let mut bars = test_bars(&[(10.0, 10.0), (11.0, 10.0)]);
        bars[1].date = bars[0].date;
        let err = run_simulation(&bars, &config(2)).unwrap_err();
        assert!(matches!(err, SimulationError::NonIncreasingDate { index: 1, .. }));
    }

    #[test]
    fn rejects_invalid_price() {
        let bars = test_bars(&[(10.0, 10.0), (0.0, 10.0)]);
        let err = run_simulation(&bars, &config(2)).unwrap_err();
        assert!(matches!(err, SimulationError::MalformedBar { index: 1, .. }));
    }

    #[test]
    fn reentry_waits_for_a_later_bar() {
        // Short on bar 1, flat on bar 2, the next entry comes on bar 3 at the earliest.
        let bars = test_bars(&[(10.0, 10.0); 4]);
        let mut signal = ScriptedSignal::new(vec![None, Some(3.0), Some(0.1), Some(-3.0)]);
        let result = run_with_signal(&bars, &config(3), &mut signal).unwrap();

        let states: Vec<_> = result.bar_log.iter().map(|r| r.position).collect();
        assert_eq!(
            states,
            vec![
                PositionState::Flat,
                PositionState::ShortSpread,
                PositionState::Flat,
                PositionState::LongSpread,
            ]
        );
        assert_eq!(result.fills.len(), 6);
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.final_position, PositionState::LongSpread);
        assert!(result.open_quantities[&Leg::A] > 0.0);
    }

    #[test]
    fn bar_log_carries_ledger_detail() {
        let bars = test_bars(&[(10.0, 10.0), (10.0, 10.0), (9.0, 10.5), (11.0, 10.0)]);
        let mut signal = ScriptedSignal::new(vec![None, Some(-3.0), Some(-1.0), Some(0.1)]);
        let result = run_with_signal(&bars, &config(3), &mut signal).unwrap();

        let open = &result.bar_log[1];
        assert_eq!(open.qty_a, 100.0);
        assert_eq!(open.qty_b, -100.0);
        assert_eq!(open.cash, 10_000.0);

        let held = &result.bar_log[2];
        assert_eq!(held.cash + held.qty_a * 9.0 + held.qty_b * 10.5, held.equity);
        assert_eq!(held.equity, 9_850.0);
        assert!((held.drawdown + 0.015).abs() < 1e-12);

        let closed = &result.bar_log[3];
        assert_eq!((closed.qty_a, closed.qty_b), (0.0, 0.0));
        assert_eq!(closed.cash, closed.equity);
        assert!(result.bar_log.iter().all(|r| r.drawdown <= 0.0));
    }

    #[test]
    fn zero_exit_threshold_holds_through_a_sign_change() {
        // |z| < 0 never holds, so a zero exit band keeps the position to the end.
        let params = SimulationParams {
            lookback: 2,
            entry_z: 1.0,
            exit_z: 0.0,
            notional_per_leg: 1_000.0,
            annualization_factor: 252,
            initial_cash: 10_000.0,
        };
        let config = SimulationConfig::new(params).unwrap();
        let bars = test_bars(&[(10.0, 10.0); 4]);
        let mut signal = ScriptedSignal::new(vec![None, Some(1.5), Some(-0.7), Some(0.0)]);
        let result = run_with_signal(&bars, &config, &mut signal).unwrap();

        let states: Vec<_> = result.bar_log.iter().map(|r| r.position).collect();
        assert_eq!(
            states,
            vec![
                PositionState::Flat,
                PositionState::ShortSpread,
                PositionState::ShortSpread,
                PositionState::ShortSpread,
            ]
        );
        assert!(result.trades.is_empty());
        assert_eq!(result.fills.len(), 2);
    }
}
