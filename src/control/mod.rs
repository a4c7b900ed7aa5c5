//! Control decision engine.
//!
//! Each tick a [`TelemetrySample`](crate::telemetry::TelemetrySample) is
//! enriched with SOC-derived power limits, the feeder voltage is classified
//! into a [`Mode`], and the matching directional PI loop produces the power
//! command. Everything here is pure apart from the [`ControllerState`] that
//! [`tick`] mutates.

pub mod mode;
pub mod pi;
pub mod soc_limit;
pub mod tick;

pub use mode::{Mode, classify};
pub use pi::{PiStep, step_over_voltage, step_under_voltage};
pub use soc_limit::{SOC_TRANSITION_WIDTH, SocLimits, soc_limits};
pub use tick::{ControllerState, Decision, tick};
