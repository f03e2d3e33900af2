//! Market Simulation
//!
//! Step-based trading environment over a single ticker's feature table.

pub mod market;

pub use market::{Action, MarketEnvironment, StepResult};
