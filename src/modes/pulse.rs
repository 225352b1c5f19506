use super::{ModeContext, ModeDetail, PulsePhase, Step};
use crate::config::PulseConfig;
use crate::error::Result;
use crate::psu::PowerReading;

/// Current limit applied during rest phases (A)
const REST_CURRENT: f64 = 0.1;

/// Alternating high-voltage pulses and low-voltage rests for desulfation
#[derive(Debug, Clone)]
pub struct PulseMode {
    config: PulseConfig,
    phase: PulsePhase,
    cycle: u32,
    phase_started: f64,
}

impl PulseMode {
    pub const fn new(config: PulseConfig) -> Self {
        Self {
            config,
            phase: PulsePhase::Pulse,
            cycle: 0,
            phase_started: 0.0,
        }
    }

    pub const fn config(&self) -> &PulseConfig {
        &self.config
    }

    pub const fn phase(&self) -> PulsePhase {
        self.phase
    }

    /// Completed pulse+rest pairs
    pub const fn cycle(&self) -> u32 {
        self.cycle
    }

    pub(super) fn validate(&self) -> Result<()> {
        self.config.validate()
    }

    pub(super) fn begin(&mut self, ctx: &mut ModeContext<'_>) -> Result<()> {
        self.cycle = 0;
        ctx.logger.info(&format!(
            "Pulse charging: {} cycles of {:.0}s at {:.2}V / {:.0}s at {:.2}V",
            self.config.max_cycles,
            self.config.pulse_duration,
            self.config.pulse_voltage,
            self.config.rest_duration,
            self.config.rest_voltage
        ));
        self.enter_pulse(ctx)
    }

    pub(super) fn advance(
        &mut self,
        _reading: &PowerReading,
        ctx: &mut ModeContext<'_>,
    ) -> Result<Step> {
        let in_phase = ctx.now - self.phase_started;
        match self.phase {
            PulsePhase::Pulse if in_phase >= self.config.pulse_duration => {
                self.enter_rest(ctx)?;
                Ok(Step::Hold)
            }
            PulsePhase::Rest if in_phase >= self.config.rest_duration => {
                self.cycle += 1;
                if self.cycle >= self.config.max_cycles {
                    ctx.logger
                        .info(&format!("Completed {} pulse cycles", self.config.max_cycles));
                    return Ok(Step::Complete { cut_output: true });
                }
                self.enter_pulse(ctx)?;
                Ok(Step::Hold)
            }
            _ => Ok(Step::Hold),
        }
    }

    fn enter_pulse(&mut self, ctx: &mut ModeContext<'_>) -> Result<()> {
        self.phase = PulsePhase::Pulse;
        self.phase_started = ctx.now;
        ctx.psu.set_voltage(self.config.pulse_voltage)?;
        ctx.psu.set_current(self.config.pulse_current)?;
        ctx.psu.set_output(true)?;
        ctx.show(&format!(
            "PULSE {}/{}",
            self.cycle + 1,
            self.config.max_cycles
        ));
        ctx.logger.debug(&format!(
            "Pulse phase: {:.2}V, {:.2}A",
            self.config.pulse_voltage, self.config.pulse_current
        ));
        Ok(())
    }

    fn enter_rest(&mut self, ctx: &mut ModeContext<'_>) -> Result<()> {
        self.phase = PulsePhase::Rest;
        self.phase_started = ctx.now;
        ctx.psu.set_voltage(self.config.rest_voltage)?;
        ctx.psu.set_current(REST_CURRENT)?;
        ctx.show(&format!("REST {}/{}", self.cycle + 1, self.config.max_cycles));
        ctx.logger
            .debug(&format!("Rest phase: {:.2}V", self.config.rest_voltage));
        Ok(())
    }

    pub(super) fn detail(&self, now: f64, _started_at: f64) -> ModeDetail {
        ModeDetail::Pulse {
            phase: self.phase,
            cycle: self.cycle,
            max_cycles: self.config.max_cycles,
            phase_elapsed: (now - self.phase_started).max(0.0),
        }
    }
}
