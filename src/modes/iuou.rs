use super::{IuouStage, ModeContext, ModeDetail, Step};
use crate::config::IuouConfig;
use crate::error::Result;
use crate::psu::PowerReading;

/// Bulk ends this far below the absorption voltage (V)
const BULK_EXIT_MARGIN: f64 = 0.1;

/// Three-stage charge: constant current, then constant voltage until the
/// current tapers, then an optional float hold.
#[derive(Debug, Clone)]
pub struct IuouMode {
    config: IuouConfig,
    stage: IuouStage,
    absorption_started: f64,
}

impl IuouMode {
    pub const fn new(config: IuouConfig) -> Self {
        Self {
            config,
            stage: IuouStage::Bulk,
            absorption_started: 0.0,
        }
    }

    pub const fn config(&self) -> &IuouConfig {
        &self.config
    }

    pub const fn stage(&self) -> IuouStage {
        self.stage
    }

    pub(super) fn validate(&self) -> Result<()> {
        self.config.validate()
    }

    pub(super) fn begin(&mut self, ctx: &mut ModeContext<'_>) -> Result<()> {
        self.stage = IuouStage::Bulk;
        self.absorption_started = ctx.now;

        ctx.psu.set_current(self.config.bulk_current)?;
        ctx.psu.set_voltage(self.config.absorption_voltage)?;
        ctx.psu.set_output(true)?;
        ctx.show(&format!("BULK {:.1}A", self.config.bulk_current));
        ctx.logger.info(&format!(
            "Bulk stage: {:.2}A up to {:.2}V",
            self.config.bulk_current, self.config.absorption_voltage
        ));
        Ok(())
    }

    pub(super) fn advance(
        &mut self,
        reading: &PowerReading,
        ctx: &mut ModeContext<'_>,
    ) -> Result<Step> {
        match self.stage {
            IuouStage::Bulk => {
                if reading.voltage >= self.config.absorption_voltage - BULK_EXIT_MARGIN {
                    self.stage = IuouStage::Absorption;
                    self.absorption_started = ctx.now;
                    ctx.show(&format!("ABS {:.1}V", self.config.absorption_voltage));
                    ctx.logger.info(&format!(
                        "Absorption stage at {:.2}V",
                        self.config.absorption_voltage
                    ));
                }
                Ok(Step::Hold)
            }
            IuouStage::Absorption => {
                let in_stage = ctx.now - self.absorption_started;
                if reading.current < self.config.absorption_current_threshold {
                    ctx.logger.info(&format!(
                        "Absorption current tapered to {:.2}A",
                        reading.current
                    ));
                    self.finish_absorption(ctx)
                } else if in_stage > self.config.absorption_timeout {
                    ctx.logger.warn(&format!(
                        "Absorption timed out after {:.0}s at {:.2}A",
                        in_stage, reading.current
                    ));
                    self.finish_absorption(ctx)
                } else {
                    Ok(Step::Hold)
                }
            }
            IuouStage::Float => Ok(Step::Hold),
        }
    }

    fn finish_absorption(&mut self, ctx: &mut ModeContext<'_>) -> Result<Step> {
        if !self.config.enable_float {
            ctx.show("COMPLETE");
            return Ok(Step::Complete { cut_output: true });
        }
        ctx.psu.set_voltage(self.config.float_voltage)?;
        self.stage = IuouStage::Float;
        ctx.show(&format!("FLOAT {:.1}V", self.config.float_voltage));
        ctx.logger
            .info(&format!("Float stage at {:.2}V", self.config.float_voltage));
        Ok(Step::Hold)
    }

    pub(super) fn detail(&self, _now: f64, _started_at: f64) -> ModeDetail {
        ModeDetail::Iuou {
            stage: self.stage,
            bulk_current: self.config.bulk_current,
            absorption_voltage: self.config.absorption_voltage,
            float_voltage: self.config.float_voltage,
            absorption_current_threshold: self.config.absorption_current_threshold,
        }
    }
}
