//! Feeder voltage regulation for a grid-tied battery energy-storage unit.

pub mod cli;
pub mod config;
/// Mode classification, SOC limits, and the directional PI controllers.
pub mod control;
/// Tick record export.
pub mod io;
pub mod logging;
/// Power command sinks.
pub mod sink;
/// Engine, clock, and run summaries.
pub mod sim;
pub mod telemetry;
