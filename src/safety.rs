//! Safety and energy accounting engine
//!
//! Independent of which mode is running, the [`SafetyMonitor`] checks every
//! tick's measurements against hard limits, watches for a voltage plateau
//! above the absorption range, integrates delivered charge and energy, and
//! estimates progress for display.

use crate::clock::SharedClock;
use crate::logging::{StructuredLogger, get_logger};
use crate::modes::{IuouStage, Lifecycle, ModeKind, ModeStatus};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

mod energy;
mod plateau;
mod progress;

pub use energy::{EnergyAccount, EnergySummary};
pub use plateau::{PlateauVerdict, VoltageWindow};
pub use progress::{estimate_progress, is_charging_complete};

/// Only this many violation messages are kept for status queries
pub const RECENT_VIOLATIONS: usize = 10;

/// Tick interval assumed when sizing the plateau window
pub const DEFAULT_TICK_INTERVAL: f64 = 5.0;

/// Hard limits and detector parameters, fixed for a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyLimits {
    pub absolute_max_voltage: f64,
    pub absolute_max_current: f64,
    pub min_voltage: f64,
    pub warning_voltage: f64,
    pub max_charging_duration: f64,
    pub max_temperature: Option<f64>,
    pub min_temperature: Option<f64>,
    pub plateau_enabled: bool,
    pub plateau_threshold_voltage: f64,
    pub plateau_time_window: f64,
    pub plateau_voltage_delta: f64,
    pub charging_efficiency: f64,
}

impl Default for SafetyLimits {
    fn default() -> Self {
        crate::config::SafetyConfig::default().limits()
    }
}

/// Result of one safety check
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub safe: bool,
    pub violations: Vec<String>,
    pub warnings: Vec<String>,
    pub should_stop: bool,
    /// Seconds since monitoring started
    pub elapsed: f64,
}

/// Monitor state for status displays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub monitoring: bool,
    pub elapsed: f64,
    pub violation_count: u64,
    pub recent_violations: Vec<String>,
    pub warning_count: u64,
}

pub struct SafetyMonitor {
    limits: SafetyLimits,
    clock: SharedClock,
    started_at: Option<f64>,
    stopped_at: Option<f64>,
    recent_violations: VecDeque<String>,
    violation_count: u64,
    warning_count: u64,
    window: VoltageWindow,
    energy: EnergyAccount,
    logger: StructuredLogger,
}

impl std::fmt::Debug for SafetyMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafetyMonitor")
            .field("limits", &self.limits)
            .field("started_at", &self.started_at)
            .field("violation_count", &self.violation_count)
            .field("warning_count", &self.warning_count)
            .field("energy", &self.energy)
            .finish_non_exhaustive()
    }
}

impl SafetyMonitor {
    pub fn new(limits: SafetyLimits, clock: SharedClock) -> Self {
        Self::with_tick_interval(limits, clock, DEFAULT_TICK_INTERVAL)
    }

    /// Size the plateau window for the loop's actual tick interval
    pub fn with_tick_interval(
        limits: SafetyLimits,
        clock: SharedClock,
        tick_interval: f64,
    ) -> Self {
        let window = VoltageWindow::new(limits.plateau_time_window, tick_interval);
        let energy = EnergyAccount::new(limits.charging_efficiency);
        Self {
            limits,
            clock,
            started_at: None,
            stopped_at: None,
            recent_violations: VecDeque::with_capacity(RECENT_VIOLATIONS),
            violation_count: 0,
            warning_count: 0,
            window,
            energy,
            logger: get_logger("safety"),
        }
    }

    pub const fn limits(&self) -> &SafetyLimits {
        &self.limits
    }

    /// Reset counters, the plateau window and the energy accumulators
    pub fn start_monitoring(&mut self) {
        self.started_at = Some(self.clock.now());
        self.stopped_at = None;
        self.recent_violations.clear();
        self.violation_count = 0;
        self.warning_count = 0;
        self.window.clear();
        self.energy.reset();
        self.logger.info("Safety monitoring started");
    }

    /// Freeze elapsed time; accumulated values stay readable
    pub fn stop_monitoring(&mut self) {
        if self.started_at.is_some() && self.stopped_at.is_none() {
            self.stopped_at = Some(self.clock.now());
            self.logger.info("Safety monitoring stopped");
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.started_at.is_some() && self.stopped_at.is_none()
    }

    /// Seconds since start_monitoring(), 0 before the first start
    pub fn elapsed(&self) -> f64 {
        match self.started_at {
            Some(start) => {
                let end = self.stopped_at.unwrap_or_else(|| self.clock.now());
                (end - start).max(0.0)
            }
            None => 0.0,
        }
    }

    /// Evaluate every limit against one set of measurements.
    ///
    /// All conditions are checked on every call; `should_stop` is set if any
    /// of them is a hard violation.
    pub fn check_safety(
        &mut self,
        voltage: f64,
        current: f64,
        temperature: Option<f64>,
    ) -> SafetyVerdict {
        let limits = &self.limits;
        let mut violations = Vec::new();
        let mut warnings = Vec::new();

        if voltage > limits.absolute_max_voltage {
            violations.push(format!(
                "Voltage {:.2}V exceeds maximum {:.2}V",
                voltage, limits.absolute_max_voltage
            ));
        }
        if voltage < limits.min_voltage {
            warnings.push(format!(
                "Voltage {:.2}V below minimum {:.2}V",
                voltage, limits.min_voltage
            ));
        } else if voltage < limits.warning_voltage {
            warnings.push(format!(
                "Recharge recommended: voltage {:.2}V below {:.2}V",
                voltage, limits.warning_voltage
            ));
        }
        if current > limits.absolute_max_current {
            violations.push(format!(
                "Current {:.2}A exceeds maximum {:.2}A",
                current, limits.absolute_max_current
            ));
        }

        let elapsed = self.elapsed();
        if elapsed > limits.max_charging_duration {
            violations.push(format!(
                "Charging duration {:.0}s exceeds maximum {:.0}s",
                elapsed, limits.max_charging_duration
            ));
        }

        if let Some(temp) = temperature {
            if let Some(max) = limits.max_temperature
                && temp > max
            {
                violations.push(format!(
                    "Temperature {:.1}°C exceeds maximum {:.1}°C",
                    temp, max
                ));
            }
            if let Some(min) = limits.min_temperature
                && temp < min
            {
                warnings.push(format!(
                    "Temperature {:.1}°C below minimum {:.1}°C",
                    temp, min
                ));
            }
        }

        for message in &violations {
            self.logger.error(message);
        }
        for message in &warnings {
            self.logger.warn(message);
        }

        if !violations.is_empty() {
            self.warning_count += 1;
            self.violation_count += violations.len() as u64;
            for message in &violations {
                if self.recent_violations.len() == RECENT_VIOLATIONS {
                    self.recent_violations.pop_front();
                }
                self.recent_violations.push_back(message.clone());
            }
        }

        let should_stop = !violations.is_empty();
        SafetyVerdict {
            safe: violations.is_empty(),
            violations,
            warnings,
            should_stop,
            elapsed,
        }
    }

    /// Record a sample and report whether voltage has flattened out above
    /// the plateau threshold
    pub fn check_voltage_plateau(&mut self, voltage: f64) -> PlateauVerdict {
        let now = self.clock.now();
        let verdict = self.window.observe(&self.limits, now, voltage);
        if verdict.monitoring && self.window.span(now) >= self.limits.plateau_time_window {
            self.logger.debug(&format!(
                "Plateau check at {:.3}V: rise {:.3}V over {:.1}min",
                voltage,
                verdict.voltage_rise,
                verdict.time_at_high_voltage / 60.0
            ));
            if verdict.is_plateau {
                self.logger.warn(&format!(
                    "Voltage plateau detected at {:.3}V (rise {:.3}V over {:.1}min)",
                    voltage,
                    verdict.voltage_rise,
                    verdict.time_at_high_voltage / 60.0
                ));
            }
        }
        verdict
    }

    /// Integrate current and power since the previous call
    pub fn update_energy_accounting(&mut self, current: f64, power: f64) -> EnergySummary {
        let now = self.clock.now();
        self.energy.integrate(now, current, power);
        self.energy.summary()
    }

    /// Accumulated energy without integrating a new sample
    pub fn energy(&self) -> EnergySummary {
        self.energy.summary()
    }

    /// Display-only progress estimate, 0 to 100
    pub fn estimate_progress(
        &self,
        mode: ModeKind,
        stage: Option<IuouStage>,
        current: f64,
        voltage: f64,
        target_voltage: f64,
        absorption_current_threshold: f64,
    ) -> f64 {
        estimate_progress(
            mode,
            stage,
            current,
            voltage,
            target_voltage,
            absorption_current_threshold,
            self.elapsed(),
            self.limits.max_charging_duration,
        )
    }

    /// Progress for a mode snapshot
    pub fn progress_for(&self, status: &ModeStatus) -> f64 {
        self.estimate_progress(
            status.mode,
            status.stage(),
            status.current,
            status.voltage,
            status.target_voltage(),
            status.absorption_current_threshold().unwrap_or(1.0),
        )
    }

    pub fn is_charging_complete(
        &self,
        mode: ModeKind,
        current: f64,
        state: Lifecycle,
        min_current: f64,
    ) -> bool {
        is_charging_complete(mode, current, state, min_current)
    }

    pub fn status(&self) -> MonitorStatus {
        MonitorStatus {
            monitoring: self.is_monitoring(),
            elapsed: self.elapsed(),
            violation_count: self.violation_count,
            recent_violations: self.recent_violations.iter().cloned().collect(),
            warning_count: self.warning_count,
        }
    }
}
