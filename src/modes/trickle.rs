use super::{ModeContext, ModeDetail, Step};
use crate::config::TrickleConfig;
use crate::error::Result;
use crate::psu::PowerReading;

/// Low-current maintenance; runs until stopped
#[derive(Debug, Clone)]
pub struct TrickleMode {
    config: TrickleConfig,
}

impl TrickleMode {
    pub const fn new(config: TrickleConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &TrickleConfig {
        &self.config
    }

    pub(super) fn validate(&self) -> Result<()> {
        self.config.validate()
    }

    pub(super) fn begin(&mut self, ctx: &mut ModeContext<'_>) -> Result<()> {
        ctx.psu.set_voltage(self.config.voltage)?;
        ctx.psu.set_current(self.config.current)?;
        ctx.psu.set_output(true)?;
        ctx.logger.info(&format!(
            "Trickle {:.2}V at {:.2}A",
            self.config.voltage, self.config.current
        ));
        Ok(())
    }

    pub(super) fn advance(
        &mut self,
        _reading: &PowerReading,
        _ctx: &mut ModeContext<'_>,
    ) -> Result<Step> {
        Ok(Step::Hold)
    }

    pub(super) fn detail(&self, _now: f64, _started_at: f64) -> ModeDetail {
        ModeDetail::Trickle {
            target_voltage: self.config.voltage,
            target_current: self.config.current,
        }
    }
}
