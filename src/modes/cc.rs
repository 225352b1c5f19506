use super::{ModeContext, ModeDetail, Step};
use crate::config::CcConfig;
use crate::error::Result;
use crate::psu::PowerReading;

/// Constant current. The voltage set-point is only a ceiling; completion is
/// decided by plateau detection in the safety monitor.
#[derive(Debug, Clone)]
pub struct CcMode {
    config: CcConfig,
}

impl CcMode {
    pub const fn new(config: CcConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &CcConfig {
        &self.config
    }

    pub(super) fn validate(&self) -> Result<()> {
        self.config.validate()
    }

    pub(super) fn begin(&mut self, ctx: &mut ModeContext<'_>) -> Result<()> {
        ctx.psu.set_current(self.config.current)?;
        ctx.psu.set_voltage(self.config.max_voltage)?;
        ctx.psu.set_output(true)?;
        ctx.show(&format!("CC {:.1}A", self.config.current));
        ctx.logger.info(&format!(
            "Constant current {:.2}A, ceiling {:.2}V",
            self.config.current, self.config.max_voltage
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
        ModeDetail::Cc {
            target_current: self.config.current,
            max_voltage: self.config.max_voltage,
        }
    }
}
