//! Domain types for PairLab

pub mod bar;
pub mod fill;
pub mod leg;
pub mod position;
pub mod trade;

pub use bar::{BarError, PairBar};
pub use fill::Fill;
pub use leg::Leg;
pub use position::{PositionState, SpreadDirection, Thresholds, Transition};
pub use trade::PairTrade;
