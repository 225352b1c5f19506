//! Configuration management for Plumbum
//!
//! This module handles loading, validation, and management of the controller
//! configuration from YAML files. Every section carries defaults so partial
//! files load; charging parameters are cloned into a mode when it is created
//! and never change underneath a running session.

use crate::error::{ChargerError, Result};
use crate::modes::ModeKind;
use crate::safety::SafetyLimits;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Charging strategies and their parameters
    pub charging: ChargingConfig,

    /// Hard safety limits, plateau detection and tick timing
    pub safety: SafetyConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Power supply connection recovery
    pub recovery: RecoveryConfig,

    /// Battery simulator used when no hardware driver is wired in
    pub simulation: SimulationConfig,
}

/// Charging mode selection plus per-mode parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargingConfig {
    /// Mode used when charging starts without an explicit mode change
    pub default_mode: String,

    /// Start charging as soon as the controller is up
    pub auto_start: bool,

    #[serde(rename = "IUoU")]
    pub iuou: IuouConfig,

    #[serde(rename = "CV")]
    pub cv: CvConfig,

    #[serde(rename = "CC")]
    pub cc: CcConfig,

    #[serde(rename = "Pulse")]
    pub pulse: PulseConfig,

    #[serde(rename = "Trickle")]
    pub trickle: TrickleConfig,

    #[serde(rename = "Conditioning")]
    pub conditioning: ConditioningConfig,
}

/// Three-stage (bulk / absorption / float) parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IuouConfig {
    /// Constant current during bulk (A)
    pub bulk_current: f64,

    /// Voltage ceiling during bulk and hold voltage during absorption (V)
    pub absorption_voltage: f64,

    /// Maintenance voltage during float (V)
    pub float_voltage: f64,

    /// Absorption ends once current tapers below this (A)
    pub absorption_current_threshold: f64,

    /// Absorption ends after this long even without taper (s)
    pub absorption_timeout: f64,

    /// When false, the session completes instead of entering float
    pub enable_float: bool,
}

/// Constant voltage parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CvConfig {
    /// Hold voltage (V)
    pub voltage: f64,

    /// Current limit (A)
    pub max_current: f64,

    /// Charge is complete below this current (A)
    pub min_current: f64,
}

/// Constant current parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CcConfig {
    /// Charging current (A), typically C/10
    pub current: f64,

    /// Safety voltage ceiling only, never a regulation target (V)
    pub max_voltage: f64,
}

/// Desulfation pulse parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    pub pulse_voltage: f64,
    pub pulse_current: f64,
    /// Pulse phase length (s)
    pub pulse_duration: f64,
    pub rest_voltage: f64,
    /// Rest phase length (s)
    pub rest_duration: f64,
    /// Number of pulse+rest pairs before completion
    pub max_cycles: u32,
}

/// Trickle maintenance parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrickleConfig {
    pub voltage: f64,
    pub current: f64,
}

/// Extended high-voltage conditioning parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditioningConfig {
    pub voltage: f64,
    pub max_current: f64,
    /// Hold time (s)
    pub duration: f64,
}

/// Safety limits as configured
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub absolute_max_voltage: f64,
    pub absolute_max_current: f64,
    pub min_voltage: f64,

    /// Below this the battery should be recharged soon (V)
    pub warning_voltage: f64,

    /// Runaway protection (s)
    pub max_charging_duration: f64,

    pub max_temperature: Option<f64>,
    pub min_temperature: Option<f64>,

    /// Fraction of delivered Ah retained by the battery
    pub charging_efficiency: f64,

    /// Tick interval of the control loop (s)
    pub measurement_interval: f64,

    /// Interval between summary log lines while charging (s)
    pub log_interval: f64,

    pub plateau_detection: PlateauConfig,
}

/// Voltage plateau detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlateauConfig {
    pub enabled: bool,

    /// Monitoring only starts above this voltage (V)
    pub threshold_voltage: f64,

    /// Window the voltage must stay flat over (s)
    pub time_window: f64,

    /// Max absolute change across the window to call it a plateau (V)
    pub voltage_delta: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console level override
    pub console_level: Option<String>,

    /// Optional file level override
    pub file_level: Option<String>,

    /// Path to log file (its parent directory receives the rolling files)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Power supply link supervision
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Attempt to reconnect a dropped supply
    pub enabled: bool,

    /// Seconds between connection checks
    pub check_interval: f64,
}

/// Simulated battery parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Nominal capacity (Ah)
    pub capacity_ah: f64,

    /// Initial state of charge (0..1)
    pub initial_soc: f64,

    /// Internal resistance (ohm)
    pub internal_resistance_ohm: f64,
}

impl SafetyConfig {
    /// Limits consumed by the safety monitor
    pub fn limits(&self) -> SafetyLimits {
        SafetyLimits {
            absolute_max_voltage: self.absolute_max_voltage,
            absolute_max_current: self.absolute_max_current,
            min_voltage: self.min_voltage,
            warning_voltage: self.warning_voltage,
            max_charging_duration: self.max_charging_duration,
            max_temperature: self.max_temperature,
            min_temperature: self.min_temperature,
            plateau_enabled: self.plateau_detection.enabled,
            plateau_threshold_voltage: self.plateau_detection.threshold_voltage,
            plateau_time_window: self.plateau_detection.time_window,
            plateau_voltage_delta: self.plateau_detection.voltage_delta,
            charging_efficiency: self.charging_efficiency,
        }
    }
}

fn require_positive(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ChargerError::validation(field, "Must be positive"))
    }
}

fn require_non_negative(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ChargerError::validation(field, "Must not be negative"))
    }
}

impl IuouConfig {
    pub fn validate(&self) -> Result<()> {
        require_positive("IUoU.bulk_current", self.bulk_current)?;
        require_positive("IUoU.absorption_voltage", self.absorption_voltage)?;
        require_positive("IUoU.float_voltage", self.float_voltage)?;
        require_non_negative(
            "IUoU.absorption_current_threshold",
            self.absorption_current_threshold,
        )?;
        require_positive("IUoU.absorption_timeout", self.absorption_timeout)?;
        if self.enable_float && self.float_voltage > self.absorption_voltage {
            return Err(ChargerError::validation(
                "IUoU.float_voltage",
                "Must not exceed absorption_voltage",
            ));
        }
        Ok(())
    }
}

impl CvConfig {
    pub fn validate(&self) -> Result<()> {
        require_positive("CV.voltage", self.voltage)?;
        require_positive("CV.max_current", self.max_current)?;
        require_non_negative("CV.min_current", self.min_current)
    }
}

impl CcConfig {
    pub fn validate(&self) -> Result<()> {
        require_positive("CC.current", self.current)?;
        require_positive("CC.max_voltage", self.max_voltage)
    }
}

impl PulseConfig {
    pub fn validate(&self) -> Result<()> {
        require_positive("Pulse.pulse_voltage", self.pulse_voltage)?;
        require_positive("Pulse.pulse_current", self.pulse_current)?;
        require_positive("Pulse.pulse_duration", self.pulse_duration)?;
        require_positive("Pulse.rest_voltage", self.rest_voltage)?;
        require_positive("Pulse.rest_duration", self.rest_duration)?;
        if self.max_cycles == 0 {
            return Err(ChargerError::validation(
                "Pulse.max_cycles",
                "Must be at least 1",
            ));
        }
        Ok(())
    }
}

impl TrickleConfig {
    pub fn validate(&self) -> Result<()> {
        require_positive("Trickle.voltage", self.voltage)?;
        require_positive("Trickle.current", self.current)
    }
}

impl ConditioningConfig {
    pub fn validate(&self) -> Result<()> {
        require_positive("Conditioning.voltage", self.voltage)?;
        require_positive("Conditioning.max_current", self.max_current)?;
        require_positive("Conditioning.duration", self.duration)
    }
}

impl ChargingConfig {
    /// Validate every mode section and the default mode name
    pub fn validate(&self) -> Result<()> {
        if let Err(e) = self.default_mode.parse::<ModeKind>() {
            let message = e.to_string();
            return Err(ChargerError::validation(
                "charging.default_mode",
                message.as_str(),
            ));
        }
        self.iuou.validate()?;
        self.cv.validate()?;
        self.cc.validate()?;
        self.pulse.validate()?;
        self.trickle.validate()?;
        self.conditioning.validate()
    }
}

impl SafetyConfig {
    pub fn validate(&self) -> Result<()> {
        require_positive("safety.absolute_max_voltage", self.absolute_max_voltage)?;
        require_positive("safety.absolute_max_current", self.absolute_max_current)?;
        require_non_negative("safety.min_voltage", self.min_voltage)?;
        require_non_negative("safety.warning_voltage", self.warning_voltage)?;
        if self.warning_voltage < self.min_voltage {
            return Err(ChargerError::validation(
                "safety.warning_voltage",
                "Must not be below min_voltage",
            ));
        }
        require_positive("safety.max_charging_duration", self.max_charging_duration)?;
        if let (Some(min), Some(max)) = (self.min_temperature, self.max_temperature)
            && min >= max
        {
            return Err(ChargerError::validation(
                "safety.min_temperature",
                "Must be below max_temperature",
            ));
        }
        if !(self.charging_efficiency > 0.0 && self.charging_efficiency <= 1.0) {
            return Err(ChargerError::validation(
                "safety.charging_efficiency",
                "Must be within (0, 1]",
            ));
        }
        require_positive("safety.measurement_interval", self.measurement_interval)?;
        require_positive("safety.log_interval", self.log_interval)?;
        require_positive(
            "safety.plateau_detection.time_window",
            self.plateau_detection.time_window,
        )?;
        require_non_negative(
            "safety.plateau_detection.voltage_delta",
            self.plateau_detection.voltage_delta,
        )
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(contents)?;
        Ok(config)
    }

    /// Load configuration from `PLUMBUM_CONFIG` or the default locations
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os("PLUMBUM_CONFIG") {
            return Self::from_file(path);
        }

        let default_paths = [
            "plumbum_config.yaml",
            "/data/plumbum_config.yaml",
            "/etc/plumbum/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // Fall back to default configuration
        Ok(Self::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.charging.validate()?;
        self.safety.validate()?;

        require_positive("recovery.check_interval", self.recovery.check_interval)?;
        require_positive("simulation.capacity_ah", self.simulation.capacity_ah)?;
        if !(0.0..=1.0).contains(&self.simulation.initial_soc) {
            return Err(ChargerError::validation(
                "simulation.initial_soc",
                "Must be within [0, 1]",
            ));
        }
        require_positive(
            "simulation.internal_resistance_ohm",
            self.simulation.internal_resistance_ohm,
        )
    }
}
