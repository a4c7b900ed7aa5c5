use tracing::info;

use crate::control::Mode;

/// A power command as handed to the PCS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Command {
    pub mode: Mode,
    /// Active power setpoint (kW; positive = charge, negative = discharge).
    pub power_kw: f64,
}

/// Destination for power commands.
///
/// Delivery is fire-and-forget from the controller's point of view; retry and
/// backpressure belong to the implementation.
pub trait CommandSink {
    fn emit(&mut self, mode: Mode, power_kw: f64);
}

/// Writes every command as a structured log event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl CommandSink for LogSink {
    fn emit(&mut self, mode: Mode, power_kw: f64) {
        info!(mode = %mode, mode_code = mode.code(), power_kw, "pcs command");
    }
}

/// Records commands in memory.
impl CommandSink for Vec<Command> {
    fn emit(&mut self, mode: Mode, power_kw: f64) {
        self.push(Command { mode, power_kw });
    }
}

impl<K: CommandSink + ?Sized> CommandSink for &mut K {
    fn emit(&mut self, mode: Mode, power_kw: f64) {
        (**self).emit(mode, power_kw);
    }
}
