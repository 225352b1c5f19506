use super::*;

impl Default for ChargingConfig {
    fn default() -> Self {
        Self {
            default_mode: "IUoU".to_string(),
            auto_start: false,
            iuou: IuouConfig::default(),
            cv: CvConfig::default(),
            cc: CcConfig::default(),
            pulse: PulseConfig::default(),
            trickle: TrickleConfig::default(),
            conditioning: ConditioningConfig::default(),
        }
    }
}

impl Default for IuouConfig {
    fn default() -> Self {
        Self {
            bulk_current: 5.0,
            absorption_voltage: 14.4,
            float_voltage: 13.6,
            absorption_current_threshold: 1.0,
            absorption_timeout: 7200.0,
            enable_float: true,
        }
    }
}

impl Default for CvConfig {
    fn default() -> Self {
        Self {
            voltage: 13.8,
            max_current: 5.0,
            min_current: 0.5,
        }
    }
}

impl Default for CcConfig {
    fn default() -> Self {
        Self {
            current: 4.4,
            max_voltage: 18.0,
        }
    }
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            pulse_voltage: 15.5,
            pulse_current: 5.0,
            pulse_duration: 30.0,
            rest_voltage: 13.0,
            rest_duration: 30.0,
            max_cycles: 20,
        }
    }
}

impl Default for TrickleConfig {
    fn default() -> Self {
        Self {
            voltage: 13.5,
            current: 0.5,
        }
    }
}

impl Default for ConditioningConfig {
    fn default() -> Self {
        Self {
            voltage: 15.5,
            max_current: 4.4,
            duration: 86400.0,
        }
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            absolute_max_voltage: 16.0,
            absolute_max_current: 5.0,
            min_voltage: 10.5,
            warning_voltage: 12.5,
            max_charging_duration: 43200.0,
            max_temperature: None,
            min_temperature: None,
            charging_efficiency: 0.83,
            measurement_interval: 5.0,
            log_interval: 60.0,
            plateau_detection: PlateauConfig::default(),
        }
    }
}

impl Default for PlateauConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_voltage: 16.0,
            time_window: 900.0,
            voltage_delta: 0.05,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/plumbum.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval: 10.0,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            capacity_ah: 44.0,
            initial_soc: 0.5,
            internal_resistance_ohm: 0.05,
        }
    }
}
