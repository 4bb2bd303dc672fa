use serde::{Deserialize, Serialize};
use std::fmt;

/// One side of the pair. `A` is the numerator of the spread, `B` the denominator.
///
/// `Ord` is derived so legs can key a `BTreeMap`: iteration order (and
/// therefore floating-point summation order) is fixed across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Leg {
    A,
    B,
}

impl Leg {
    pub const ALL: [Leg; 2] = [Leg::A, Leg::B];
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leg::A => write!(f, "A"),
            Leg::B => write!(f, "B"),
        }
    }
}
