//! Charging mode state machine
//!
//! A [`ChargingMode`] wraps one of six strategies ([`ModeState`]) behind a
//! common lifecycle: `Idle → Charging → {Completed | Stopped | Error}`. The
//! strategy decides set-points and sub-stage transitions from each tick's
//! measurements; the wrapper owns the lifecycle, the start timestamp and the
//! last snapshot, and guarantees the output-off command on stop.
//!
//! Modes never own the power supply. Every hardware-touching call takes it
//! as `&mut dyn PowerSupply` so the driver decides who holds it.

use crate::clock::SharedClock;
use crate::config::ChargingConfig;
use crate::error::{ChargerError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::psu::{PowerReading, PowerSupply, clip_display_text};

mod cc;
mod conditioning;
mod cv;
mod iuou;
mod pulse;
mod trickle;
mod types;

pub use cc::CcMode;
pub use conditioning::ConditioningMode;
pub use cv::CvMode;
pub use iuou::IuouMode;
pub use pulse::PulseMode;
pub use trickle::TrickleMode;
pub use types::{IuouStage, Lifecycle, ModeDetail, ModeKind, ModeStatus, PulsePhase};

/// What a strategy wants after looking at a tick's measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Hold,
    /// Charge is finished; `cut_output` asks for the output to be disabled
    Complete { cut_output: bool },
}

/// Borrowed per-call environment handed to a strategy
pub(crate) struct ModeContext<'a> {
    pub psu: &'a mut dyn PowerSupply,
    pub logger: &'a StructuredLogger,
    pub now: f64,
    pub started_at: f64,
}

impl ModeContext<'_> {
    /// Seconds since the mode was started
    pub fn elapsed(&self) -> f64 {
        (self.now - self.started_at).max(0.0)
    }

    /// Best-effort front panel text; failures never affect charging
    pub fn show(&mut self, text: &str) {
        if let Err(e) = self.psu.set_display_text(clip_display_text(text)) {
            self.logger
                .debug(&format!("Display update '{}' failed: {}", text, e));
        }
    }
}

/// The six strategies, each carrying its own parameters and sub-state
#[derive(Debug, Clone)]
pub enum ModeState {
    Iuou(IuouMode),
    Cv(CvMode),
    Cc(CcMode),
    Pulse(PulseMode),
    Trickle(TrickleMode),
    Conditioning(ConditioningMode),
}

macro_rules! dispatch {
    ($state:expr, $mode:ident => $body:expr) => {
        match $state {
            ModeState::Iuou($mode) => $body,
            ModeState::Cv($mode) => $body,
            ModeState::Cc($mode) => $body,
            ModeState::Pulse($mode) => $body,
            ModeState::Trickle($mode) => $body,
            ModeState::Conditioning($mode) => $body,
        }
    };
}

impl ModeState {
    /// Build the strategy for `kind` with a snapshot of its parameters
    pub fn from_config(kind: ModeKind, config: &ChargingConfig) -> Self {
        match kind {
            ModeKind::Iuou => Self::Iuou(IuouMode::new(config.iuou.clone())),
            ModeKind::Cv => Self::Cv(CvMode::new(config.cv.clone())),
            ModeKind::Cc => Self::Cc(CcMode::new(config.cc.clone())),
            ModeKind::Pulse => Self::Pulse(PulseMode::new(config.pulse.clone())),
            ModeKind::Trickle => Self::Trickle(TrickleMode::new(config.trickle.clone())),
            ModeKind::Conditioning => {
                Self::Conditioning(ConditioningMode::new(config.conditioning.clone()))
            }
        }
    }

    pub const fn kind(&self) -> ModeKind {
        match self {
            Self::Iuou(_) => ModeKind::Iuou,
            Self::Cv(_) => ModeKind::Cv,
            Self::Cc(_) => ModeKind::Cc,
            Self::Pulse(_) => ModeKind::Pulse,
            Self::Trickle(_) => ModeKind::Trickle,
            Self::Conditioning(_) => ModeKind::Conditioning,
        }
    }

    fn validate(&self) -> Result<()> {
        dispatch!(self, m => m.validate())
    }

    fn begin(&mut self, ctx: &mut ModeContext<'_>) -> Result<()> {
        dispatch!(self, m => m.begin(ctx))
    }

    fn advance(&mut self, reading: &PowerReading, ctx: &mut ModeContext<'_>) -> Result<Step> {
        dispatch!(self, m => m.advance(reading, ctx))
    }

    fn detail(&self, now: f64, started_at: f64) -> ModeDetail {
        dispatch!(self, m => m.detail(now, started_at))
    }
}

/// A charging strategy plus its lifecycle
pub struct ChargingMode {
    state: ModeState,
    lifecycle: Lifecycle,
    clock: SharedClock,
    start_time: Option<f64>,
    last_reading: PowerReading,
    output_off_confirmed: bool,
    logger: StructuredLogger,
}

impl std::fmt::Debug for ChargingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChargingMode")
            .field("state", &self.state)
            .field("lifecycle", &self.lifecycle)
            .field("start_time", &self.start_time)
            .field("last_reading", &self.last_reading)
            .finish_non_exhaustive()
    }
}

impl ChargingMode {
    /// Look up a mode by name (case-insensitive) and snapshot its parameters.
    ///
    /// Unknown names fail with [`ChargerError::Config`]; no hardware is
    /// touched here.
    pub fn create(name: &str, config: &ChargingConfig, clock: SharedClock) -> Result<Self> {
        let kind: ModeKind = name.parse()?;
        Ok(Self::new(ModeState::from_config(kind, config), clock))
    }

    pub fn new(state: ModeState, clock: SharedClock) -> Self {
        let logger =
            get_logger_with_context(LogContext::new("modes").with_mode(state.kind().name()));
        Self {
            state,
            lifecycle: Lifecycle::Idle,
            clock,
            start_time: None,
            last_reading: PowerReading::default(),
            output_off_confirmed: false,
            logger,
        }
    }

    pub const fn kind(&self) -> ModeKind {
        self.state.kind()
    }

    pub const fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_charging(&self) -> bool {
        self.lifecycle == Lifecycle::Charging
    }

    /// Strategy and its current sub-state
    pub const fn state(&self) -> &ModeState {
        &self.state
    }

    /// The last output-off command was acknowledged by the supply
    pub const fn output_off_confirmed(&self) -> bool {
        self.output_off_confirmed
    }

    /// Timestamp of the last successful start()
    pub const fn start_time(&self) -> Option<f64> {
        self.start_time
    }

    /// Validate parameters, reset sub-state and issue the initial set-points.
    ///
    /// Invalid parameters fail with [`ChargerError::Config`] before any
    /// command reaches the supply. A rejected command moves the mode to
    /// [`Lifecycle::Error`] and returns the hardware error.
    pub fn start(&mut self, psu: &mut dyn PowerSupply) -> Result<()> {
        if self.is_charging() {
            return Err(ChargerError::generic(format!(
                "{} mode is already charging",
                self.kind()
            )));
        }
        self.state
            .validate()
            .map_err(|e| ChargerError::config(e.to_string()))?;

        let now = self.clock.now();
        self.start_time = Some(now);
        self.output_off_confirmed = false;
        self.last_reading = PowerReading::default();

        let mut ctx = ModeContext {
            psu,
            logger: &self.logger,
            now,
            started_at: now,
        };
        match self.state.begin(&mut ctx) {
            Ok(()) => {
                self.lifecycle = Lifecycle::Charging;
                self.logger.info(&format!("Started {} charging", self.kind()));
                Ok(())
            }
            Err(e) => {
                self.lifecycle = Lifecycle::Error;
                self.logger
                    .error(&format!("Failed to start {} charging: {}", self.kind(), e));
                Err(e)
            }
        }
    }

    /// Run one control tick and return the resulting snapshot.
    ///
    /// Outside `Charging` this is a no-op returning the last snapshot. Read or
    /// write failures move the mode to `Error` instead of propagating.
    pub fn update(&mut self, psu: &mut dyn PowerSupply) -> ModeStatus {
        if !self.is_charging() {
            return self.status();
        }
        let now = self.clock.now();
        let started_at = self.start_time.unwrap_or(now);

        let reading = match PowerReading::sample(psu) {
            Ok(reading) => reading,
            Err(e) => {
                self.fail(&format!("Measurement failed: {}", e));
                return self.status();
            }
        };
        self.last_reading = reading;

        let mut ctx = ModeContext {
            psu,
            logger: &self.logger,
            now,
            started_at,
        };
        match self.state.advance(&reading, &mut ctx) {
            Ok(Step::Hold) => {}
            Ok(Step::Complete { cut_output }) => {
                if cut_output {
                    if let Err(e) = ctx.psu.set_output(false) {
                        self.fail(&format!("Failed to disable output on completion: {}", e));
                        return self.status();
                    }
                    self.output_off_confirmed = true;
                }
                self.lifecycle = Lifecycle::Completed;
                self.logger.info(&format!("{} charging complete", self.kind()));
            }
            Err(e) => self.fail(&format!("Set-point update failed: {}", e)),
        }
        self.status()
    }

    /// Force the output off and mark the mode stopped.
    ///
    /// Never fails. Once the output is confirmed off, repeated calls issue no
    /// further commands.
    pub fn stop(&mut self, psu: &mut dyn PowerSupply) {
        if self.lifecycle == Lifecycle::Stopped && self.output_off_confirmed {
            return;
        }
        match psu.set_output(false) {
            Ok(()) => self.output_off_confirmed = true,
            Err(e) => {
                self.output_off_confirmed = false;
                self.logger
                    .error(&format!("Failed to disable output on stop: {}", e));
            }
        }
        if self.lifecycle != Lifecycle::Idle || self.start_time.is_some() {
            self.logger.info(&format!("Stopped {} charging", self.kind()));
        }
        self.lifecycle = Lifecycle::Stopped;
    }

    /// Seconds since start(), 0 if never started
    pub fn elapsed(&self) -> f64 {
        self.start_time
            .map_or(0.0, |start| self.clock.elapsed_since(start))
    }

    /// Last snapshot with lifecycle, elapsed time and sub-state refreshed
    pub fn status(&self) -> ModeStatus {
        let now = self.clock.now();
        ModeStatus {
            mode: self.kind(),
            state: self.lifecycle,
            voltage: self.last_reading.voltage,
            current: self.last_reading.current,
            power: self.last_reading.power,
            elapsed: self.elapsed(),
            detail: self.state.detail(now, self.start_time.unwrap_or(now)),
        }
    }

    /// Manual current limit override while charging
    pub fn set_current(&mut self, psu: &mut dyn PowerSupply, amps: f64) -> Result<()> {
        if !amps.is_finite() || amps < 0.0 {
            return Err(ChargerError::validation(
                "current".to_string(),
                format!("must be a non-negative number, got {}", amps),
            ));
        }
        psu.set_current(amps)?;
        self.logger
            .info(&format!("Current limit overridden to {:.2}A", amps));
        Ok(())
    }

    fn fail(&mut self, message: &str) {
        self.lifecycle = Lifecycle::Error;
        self.logger.error(message);
    }
}

#[cfg(test)]
mod tests;
