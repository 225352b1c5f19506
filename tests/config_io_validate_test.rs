use plumbum::config::Config;
use std::fs;

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = Config::default();
    cfg.charging.default_mode = "CV".to_string();
    cfg.charging.iuou.absorption_voltage = 14.7;
    cfg.safety.max_temperature = Some(45.0);
    cfg.logging.file = path.with_extension("log").to_string_lossy().to_string();

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.charging.default_mode, "CV");
    assert!((loaded.charging.iuou.absorption_voltage - 14.7).abs() < 1e-9);
    assert_eq!(loaded.safety.max_temperature, Some(45.0));
    assert_eq!(loaded.logging.file, cfg.logging.file);
    loaded.validate().unwrap();
}

#[test]
fn partial_yaml_uses_defaults() {
    let yaml = r"
charging:
  default_mode: pulse
  Pulse:
    max_cycles: 5
safety:
  plateau_detection:
    enabled: false
";
    let cfg = Config::from_yaml_str(yaml).unwrap();
    assert_eq!(cfg.charging.pulse.max_cycles, 5);
    assert!((cfg.charging.pulse.pulse_voltage - 15.5).abs() < 1e-9);
    assert!(!cfg.safety.plateau_detection.enabled);
    assert!((cfg.safety.absolute_max_voltage - 16.0).abs() < 1e-9);
    cfg.validate().unwrap();
}

#[test]
fn defaults_match_lead_acid_profile() {
    let cfg = Config::default();
    assert_eq!(cfg.charging.default_mode, "IUoU");
    assert!((cfg.charging.iuou.bulk_current - 5.0).abs() < 1e-9);
    assert!((cfg.charging.iuou.float_voltage - 13.6).abs() < 1e-9);
    assert!((cfg.charging.cc.max_voltage - 18.0).abs() < 1e-9);
    assert!((cfg.safety.charging_efficiency - 0.83).abs() < 1e-9);
    assert!((cfg.safety.measurement_interval - 5.0).abs() < 1e-9);

    let limits = cfg.safety.limits();
    assert!(limits.plateau_enabled);
    assert!((limits.plateau_time_window - 900.0).abs() < 1e-9);
    assert!((limits.plateau_voltage_delta - 0.05).abs() < 1e-9);
}

#[test]
fn config_validation_errors() {
    let mut cfg = Config::default();

    // Unknown mode
    cfg.charging.default_mode = "Boost".to_string();
    assert!(cfg.validate().is_err());

    // Non-positive set-points
    cfg = Config::default();
    cfg.charging.iuou.bulk_current = 0.0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.charging.pulse.max_cycles = 0;
    assert!(cfg.validate().is_err());

    // Efficiency outside (0, 1]
    cfg = Config::default();
    cfg.safety.charging_efficiency = 1.2;
    assert!(cfg.validate().is_err());

    // Inverted temperature window
    cfg = Config::default();
    cfg.safety.min_temperature = Some(40.0);
    cfg.safety.max_temperature = Some(10.0);
    assert!(cfg.validate().is_err());

    // Tick interval zero
    cfg = Config::default();
    cfg.safety.measurement_interval = 0.0;
    assert!(cfg.validate().is_err());
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"bad: [unclosed").unwrap();
    let err = Config::from_file(tmp.path()).unwrap_err();
    let msg = format!("{}", err);
    assert!(msg.contains("Serialization error"));
}
