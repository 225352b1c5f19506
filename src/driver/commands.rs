use super::{ChargerDriver, DriverCommand, DriverState};
use crate::error::{ChargerError, Result};
use crate::logging::{LogContext, get_logger, get_logger_with_context};
use crate::modes::{ChargingMode, Lifecycle};
use crate::session::EndReason;

impl ChargerDriver {
    pub(crate) fn handle_command(&mut self, cmd: DriverCommand) {
        self.logger.debug(&format!("Handling command {:?}", cmd));
        match cmd {
            DriverCommand::Start => {
                if let Err(e) = self.start_charging() {
                    self.logger.error(&format!("Start failed: {}", e));
                }
            }
            DriverCommand::Stop => self.stop_charging(EndReason::UserStop),
            DriverCommand::SetMode(name) => self.set_mode(&name),
            DriverCommand::SetCurrent(amps) => self.set_current(amps),
        }
    }

    /// Start a session with the selected mode, creating the default mode if
    /// none has been selected yet
    pub fn start_charging(&mut self) -> Result<()> {
        if self.is_charging() {
            self.logger.warn("Start ignored, already charging");
            return Ok(());
        }
        if self.mode.is_none() {
            let mode = ChargingMode::create(
                &self.config.charging.default_mode,
                &self.config.charging,
                self.clock.clone(),
            )?;
            self.mode = Some(mode);
        }
        let Some(mode) = self.mode.as_mut() else {
            return Err(ChargerError::generic("No charging mode selected"));
        };

        if let Err(e) = mode.start(self.psu.as_mut()) {
            if e.is_hardware() {
                mode.stop(self.psu.as_mut());
                self.state.send_replace(DriverState::Error(e.to_string()));
            }
            return Err(e);
        }
        let kind = mode.kind();

        self.monitor.start_monitoring();
        let start_voltage = self.psu.measure_voltage().unwrap_or(0.0);
        match self.sessions.start_session(kind, start_voltage) {
            Ok(id) => {
                self.logger = get_logger_with_context(
                    LogContext::new("driver")
                        .with_session_id(id)
                        .with_mode(kind.name()),
                );
            }
            Err(e) => self.logger.warn(&format!("Session tracking: {}", e)),
        }
        self.last_summary_log = self.clock.now();
        self.state.send_replace(DriverState::Running);
        self.logger
            .info(&format!("Charging started in {} mode", kind));
        Ok(())
    }

    /// End the active session, forcing the output off
    pub fn stop_charging(&mut self, reason: EndReason) {
        let had_session = self.sessions.has_active_session();
        match self.mode.as_mut() {
            // Completed with the output already cut; keep the Completed state
            Some(mode)
                if mode.lifecycle() == Lifecycle::Completed && mode.output_off_confirmed() => {}
            Some(mode) => mode.stop(self.psu.as_mut()),
            None => {
                if let Err(e) = self.psu.set_output(false) {
                    self.logger
                        .error(&format!("Failed to disable output: {}", e));
                }
            }
        }
        if !had_session {
            return;
        }

        self.monitor.stop_monitoring();
        let (end_voltage, duration) = self
            .mode
            .as_ref()
            .map_or((0.0, 0.0), |m| (m.status().voltage, m.elapsed()));
        if let Err(e) = self
            .sessions
            .end_session(reason, end_voltage, duration, self.monitor.energy())
        {
            self.logger.warn(&format!("Session tracking: {}", e));
        }
        self.last_end_reason = Some(reason);
        self.logger.info(&format!("Charging stopped: {}", reason));
        self.logger = get_logger("driver");
    }

    /// Select a new mode. An active session is stopped first; an unknown name
    /// leaves the current mode untouched.
    pub fn set_mode(&mut self, name: &str) {
        match ChargingMode::create(name, &self.config.charging, self.clock.clone()) {
            Ok(mode) => {
                if self.sessions.has_active_session() || self.is_charging() {
                    self.stop_charging(EndReason::ModeChange);
                }
                self.logger
                    .info(&format!("Charging mode set to {}", mode.kind()));
                self.mode = Some(mode);
            }
            Err(e) => self
                .logger
                .error(&format!("Mode change to '{}' rejected: {}", name, e)),
        }
    }

    /// Apply a current limit to the running mode, clamped to the hard limit
    pub fn set_current(&mut self, amps: f64) {
        let max = self.monitor.limits().absolute_max_current;
        let clamped = if amps.is_finite() {
            amps.clamp(0.0, max)
        } else {
            0.0
        };
        match self.mode.as_mut() {
            Some(mode) if mode.is_charging() => {
                if let Err(e) = mode.set_current(self.psu.as_mut(), clamped) {
                    self.logger
                        .error(&format!("Failed to set current to {:.2}A: {}", clamped, e));
                }
            }
            _ => self
                .logger
                .warn(&format!("Current override {:.2}A ignored, not charging", clamped)),
        }
    }
}
