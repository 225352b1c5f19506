use super::{ModeContext, ModeDetail, Step};
use crate::config::ConditioningConfig;
use crate::error::Result;
use crate::psu::PowerReading;

/// Current above this is suspicious once the battery should be full (A)
const ELECTROLYSIS_CURRENT: f64 = 1.0;
/// How long high current must persist before warning (s)
const ELECTROLYSIS_AFTER: f64 = 3600.0;

/// Extended high-voltage hold for flooded batteries.
///
/// Sustained current above 1 A for more than an hour means the supply is
/// mostly splitting water, which is surfaced as `electrolysis_warning`.
#[derive(Debug, Clone)]
pub struct ConditioningMode {
    config: ConditioningConfig,
    high_current_since: Option<f64>,
    warned: bool,
}

impl ConditioningMode {
    pub const fn new(config: ConditioningConfig) -> Self {
        Self {
            config,
            high_current_since: None,
            warned: false,
        }
    }

    pub const fn config(&self) -> &ConditioningConfig {
        &self.config
    }

    pub(super) fn validate(&self) -> Result<()> {
        self.config.validate()
    }

    pub(super) fn begin(&mut self, ctx: &mut ModeContext<'_>) -> Result<()> {
        self.high_current_since = None;
        self.warned = false;

        ctx.logger.info(&format!(
            "Conditioning at {:.2}V, limit {:.2}A for {:.1}h",
            self.config.voltage,
            self.config.max_current,
            self.config.duration / 3600.0
        ));
        ctx.logger
            .warn("Conditioning is only for open flooded batteries with caps removed");
        ctx.logger.warn("Watch for excessive gassing and water loss");

        ctx.psu.set_voltage(self.config.voltage)?;
        ctx.psu.set_current(self.config.max_current)?;
        ctx.psu.set_output(true)?;
        ctx.show(&format!("COND {:.1}V", self.config.voltage));
        Ok(())
    }

    pub(super) fn advance(
        &mut self,
        reading: &PowerReading,
        ctx: &mut ModeContext<'_>,
    ) -> Result<Step> {
        if reading.current > ELECTROLYSIS_CURRENT {
            let since = *self.high_current_since.get_or_insert(ctx.now);
            if !self.warned && ctx.now - since > ELECTROLYSIS_AFTER {
                self.warned = true;
                ctx.logger.warn(&format!(
                    "Sustained high current ({:.2}A) for over an hour, likely electrolysis",
                    reading.current
                ));
            }
        } else {
            self.high_current_since = None;
            self.warned = false;
        }

        if ctx.elapsed() >= self.config.duration {
            ctx.logger.info(&format!(
                "Conditioning duration ({:.1}h) complete",
                self.config.duration / 3600.0
            ));
            ctx.show("COND DONE");
            return Ok(Step::Complete { cut_output: true });
        }
        Ok(Step::Hold)
    }

    pub(super) fn detail(&self, now: f64, started_at: f64) -> ModeDetail {
        let elapsed = (now - started_at).max(0.0);
        ModeDetail::Conditioning {
            target_voltage: self.config.voltage,
            duration: self.config.duration,
            progress: (elapsed / self.config.duration * 100.0).min(100.0),
            electrolysis_warning: self
                .high_current_since
                .is_some_and(|since| now - since > ELECTROLYSIS_AFTER),
        }
    }
}
