use super::{ModeContext, ModeDetail, Step};
use crate::config::CvConfig;
use crate::error::Result;
use crate::psu::PowerReading;

/// Constant voltage with a current limit; done once current falls below
/// `min_current`.
#[derive(Debug, Clone)]
pub struct CvMode {
    config: CvConfig,
}

impl CvMode {
    pub const fn new(config: CvConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &CvConfig {
        &self.config
    }

    pub(super) fn validate(&self) -> Result<()> {
        self.config.validate()
    }

    pub(super) fn begin(&mut self, ctx: &mut ModeContext<'_>) -> Result<()> {
        ctx.psu.set_voltage(self.config.voltage)?;
        ctx.psu.set_current(self.config.max_current)?;
        ctx.psu.set_output(true)?;
        ctx.show(&format!("CV {:.1}V", self.config.voltage));
        ctx.logger.info(&format!(
            "Constant voltage {:.2}V, limit {:.2}A",
            self.config.voltage, self.config.max_current
        ));
        Ok(())
    }

    pub(super) fn advance(
        &mut self,
        reading: &PowerReading,
        ctx: &mut ModeContext<'_>,
    ) -> Result<Step> {
        if reading.current < self.config.min_current {
            ctx.logger.info(&format!(
                "Current {:.2}A below {:.2}A",
                reading.current, self.config.min_current
            ));
            return Ok(Step::Complete { cut_output: false });
        }
        Ok(Step::Hold)
    }

    pub(super) fn detail(&self, _now: f64, _started_at: f64) -> ModeDetail {
        ModeDetail::Cv {
            target_voltage: self.config.voltage,
            min_current: self.config.min_current,
        }
    }
}
