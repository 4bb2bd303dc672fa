//! Simulation engine — bar-by-bar loop and supporting infrastructure.
//!
//! The engine consumes a validated, date-ordered `PairBar` sequence and runs
//! signal → transition → fills → mark once per bar. It performs no I/O.

pub mod config;
pub mod execution;
pub mod ledger;
pub mod loop_runner;
pub mod state;

pub use config::{ConfigError, SimulationConfig, SimulationParams};
pub use execution::{ExecutionSimulator, FillPair};
pub use ledger::{EquityPoint, PortfolioLedger};
pub use loop_runner::{run_simulation, run_with_signal, validate_bars, SimulationError};
pub use state::{BarRecord, SimulationResult, SimulationState};
