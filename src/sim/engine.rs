//! Control loop engine that ties telemetry, the controller, and the command sink together.

use tracing::{debug, warn};

use crate::config::ControlConfig;
use crate::control::{ControllerState, Mode, tick};
use crate::sink::{Command, CommandSink};
use crate::telemetry::TelemetrySource;

use super::clock::Clock;
use super::types::TickRecord;

/// Control loop engine owning configuration, controller state, source, and sink.
///
/// Generic over the telemetry source and command sink for static dispatch.
/// One engine drives one storage unit; several units need several engines.
pub struct Engine<S: TelemetrySource, K: CommandSink> {
    config: ControlConfig,
    state: ControllerState,
    source: S,
    sink: K,
    held: Command,
}

impl<S: TelemetrySource, K: CommandSink> Engine<S, K> {
    /// Creates a new engine in the initial controller state.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated controller configuration
    /// * `source` - Per-tick telemetry source
    /// * `sink` - Destination for power commands
    pub fn new(config: ControlConfig, source: S, sink: K) -> Self {
        Self {
            config,
            state: ControllerState::new(),
            source,
            sink,
            held: Command {
                mode: Mode::Normal,
                power_kw: 0.0,
            },
        }
    }

    /// Executes one control tick and returns its record.
    ///
    /// When the source reports telemetry as unavailable the previous mode and
    /// command are re-issued and the controller state is left untouched.
    pub fn step(&mut self, t: usize) -> TickRecord {
        match self.source.sample(t) {
            Ok(sample) => {
                let decision = tick(&self.config, &mut self.state, &sample);
                self.held = Command {
                    mode: decision.mode,
                    power_kw: decision.command_kw,
                };
                self.sink.emit(decision.mode, decision.command_kw);

                let record = TickRecord::computed(t, &sample, &decision, &self.state);
                debug!(
                    tick = t,
                    v_meas = sample.v_meas,
                    soc = sample.soc,
                    p_meas = sample.p_meas,
                    charge_limit_kw = decision.limits.charge_kw,
                    discharge_limit_kw = decision.limits.discharge_kw,
                    mode = %decision.mode,
                    command_kw = decision.command_kw,
                    "tick"
                );
                record
            }
            Err(err) => {
                warn!(
                    tick = t,
                    source = self.source.source_name(),
                    error = %err,
                    mode = %self.held.mode,
                    command_kw = self.held.power_kw,
                    "holding previous command"
                );
                self.sink.emit(self.held.mode, self.held.power_kw);
                TickRecord::held(t, self.held, &self.state)
            }
        }
    }

    /// Runs every tick the clock hands out, passing each record to `on_tick`.
    pub fn run_with(&mut self, clock: &mut Clock, mut on_tick: impl FnMut(&TickRecord)) {
        clock.run(|t| {
            let record = self.step(t);
            on_tick(&record);
        });
    }

    /// Runs a bounded clock to completion and returns all records.
    ///
    /// # Panics
    ///
    /// Panics if `clock` is unbounded; use [`Engine::run_with`] instead.
    pub fn run(&mut self, clock: &mut Clock) -> Vec<TickRecord> {
        assert!(clock.is_bounded(), "run() needs a bounded clock");
        let mut records = Vec::new();
        self.run_with(clock, |r| records.push(r.clone()));
        records
    }

    /// Returns the controller state.
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Returns the command sink.
    pub fn sink(&self) -> &K {
        &self.sink
    }
}
