//! Pair position state machine.
//!
//! `Flat -> {LongSpread, ShortSpread} -> Flat`. Exit is checked before entry
//! and at most one transition happens per bar, so a position closed on a bar
//! can only be re-opened on a later bar.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of an open pair position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpreadDirection {
    /// Long A, short B. Entered when the spread is unusually low.
    Long,
    /// Short A, long B. Entered when the spread is unusually high.
    Short,
}

impl SpreadDirection {
    /// Sign of the A leg; the B leg takes the opposite sign.
    pub fn leg_a_sign(&self) -> f64 {
        match self {
            SpreadDirection::Long => 1.0,
            SpreadDirection::Short => -1.0,
        }
    }
}

impl fmt::Display for SpreadDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpreadDirection::Long => write!(f, "long_spread"),
            SpreadDirection::Short => write!(f, "short_spread"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PositionState {
    #[default]
    Flat,
    LongSpread,
    ShortSpread,
}

/// A change of position state requested for the current bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    Enter(SpreadDirection),
    Exit,
}

/// Z-score thresholds. Validated by `SimulationConfig`: `entry_z > exit_z >= 0`.
///
/// Both comparisons are strict. With `exit_z == 0` the exit test `|z| < 0`
/// can never pass, so a position is not closed on any signal, not even when
/// z crosses zero; it stays open and is marked to market until the run ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub entry_z: f64,
    pub exit_z: f64,
}

impl PositionState {
    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }

    pub fn direction(&self) -> Option<SpreadDirection> {
        match self {
            PositionState::Flat => None,
            PositionState::LongSpread => Some(SpreadDirection::Long),
            PositionState::ShortSpread => Some(SpreadDirection::Short),
        }
    }

    /// Decide the transition for this bar's z-score, if any.
    ///
    /// An undefined z-score (`None`) never moves the state.
    pub fn transition(&self, zscore: Option<f64>, thresholds: &Thresholds) -> Option<Transition> {
        let z = zscore?;
        match self {
            PositionState::LongSpread | PositionState::ShortSpread => {
                (z.abs() < thresholds.exit_z).then_some(Transition::Exit)
            }
            PositionState::Flat => {
                if z < -thresholds.entry_z {
                    Some(Transition::Enter(SpreadDirection::Long))
                } else if z > thresholds.entry_z {
                    Some(Transition::Enter(SpreadDirection::Short))
                } else {
                    None
                }
            }
        }
    }

    /// State after applying `transition`.
    pub fn apply(self, transition: Transition) -> PositionState {
        match transition {
            Transition::Enter(direction) => {
                debug_assert!(self.is_flat(), "enter requested while {self:?}");
                match direction {
                    SpreadDirection::Long => PositionState::LongSpread,
                    SpreadDirection::Short => PositionState::ShortSpread,
                }
            }
            Transition::Exit => {
                debug_assert!(!self.is_flat(), "exit requested while flat");
                PositionState::Flat
            }
        }
    }
}

impl fmt::Display for PositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction() {
            None => write!(f, "flat"),
            Some(direction) => write!(f, "{direction}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TH: Thresholds = Thresholds {
        entry_z: 2.0,
        exit_z: 0.5,
    };

    #[test]
    fn undefined_zscore_never_transitions() {
        for state in [
            PositionState::Flat,
            PositionState::LongSpread,
            PositionState::ShortSpread,
        ] {
            assert_eq!(state.transition(None, &TH), None);
        }
    }

    #[test]
    fn flat_enters_long_below_negative_entry() {
        assert_eq!(
            PositionState::Flat.transition(Some(-2.1), &TH),
            Some(Transition::Enter(SpreadDirection::Long))
        );
    }

    #[test]
    fn flat_enters_short_above_entry() {
        assert_eq!(
            PositionState::Flat.transition(Some(2.1), &TH),
            Some(Transition::Enter(SpreadDirection::Short))
        );
    }

    #[test]
    fn entry_threshold_is_strict() {
        assert_eq!(PositionState::Flat.transition(Some(2.0), &TH), None);
        assert_eq!(PositionState::Flat.transition(Some(-2.0), &TH), None);
    }

    #[test]
    fn open_position_exits_inside_band() {
        assert_eq!(
            PositionState::ShortSpread.transition(Some(0.2), &TH),
            Some(Transition::Exit)
        );
        assert_eq!(
            PositionState::LongSpread.transition(Some(-0.49), &TH),
            Some(Transition::Exit)
        );
    }

    #[test]
    fn open_position_holds_between_thresholds() {
        assert_eq!(PositionState::ShortSpread.transition(Some(0.8), &TH), None);
        assert_eq!(PositionState::LongSpread.transition(Some(-1.5), &TH), None);
        assert_eq!(PositionState::LongSpread.transition(Some(0.5), &TH), None);
    }

    #[test]
    fn open_position_never_reverses_directly() {
        // An opposite extreme keeps the position; reversal needs a flat bar first.
        assert_eq!(PositionState::LongSpread.transition(Some(3.0), &TH), None);
        assert_eq!(PositionState::ShortSpread.transition(Some(-3.0), &TH), None);
    }

    #[test]
    fn zero_exit_threshold_never_exits() {
        let th = Thresholds {
            entry_z: 1.0,
            exit_z: 0.0,
        };
        assert_eq!(PositionState::LongSpread.transition(Some(0.0), &th), None);
        assert_eq!(PositionState::ShortSpread.transition(Some(-0.7), &th), None);
        assert_eq!(PositionState::ShortSpread.transition(Some(-0.0), &th), None);
    }

    #[test]
    fn apply_moves_through_flat() {
        let long = PositionState::Flat.apply(Transition::Enter(SpreadDirection::Long));
        assert_eq!(long, PositionState::LongSpread);
        assert_eq!(long.direction(), Some(SpreadDirection::Long));
        assert_eq!(long.apply(Transition::Exit), PositionState::Flat);
    }

    #[test]
    fn display_names() {
        assert_eq!(PositionState::Flat.to_string(), "flat");
        assert_eq!(PositionState::LongSpread.to_string(), "long_spread");
        assert_eq!(PositionState::ShortSpread.to_string(), "short_spread");
    }
}
