use super::*;
use crate::clock::ManualClock;
use crate::config::{ChargingConfig, IuouConfig, PulseConfig};
use crate::psu::{MockSupply, SupplyCommand};

fn setup(name: &str, config: &ChargingConfig) -> (ChargingMode, MockSupply, ManualClock) {
    let clock = ManualClock::new(1_000.0);
    let mode = ChargingMode::create(name, config, clock.shared()).unwrap();
    (mode, MockSupply::new(), clock)
}

fn started(name: &str, config: &ChargingConfig) -> (ChargingMode, MockSupply, ManualClock) {
    let (mut mode, mut psu, clock) = setup(name, config);
    mode.start(&mut psu).unwrap();
    (mode, psu, clock)
}

#[test]
fn unknown_mode_fails_without_touching_hardware() {
    let clock = ManualClock::new(0.0);
    let err =
        ChargingMode::create("Boost", &ChargingConfig::default(), clock.shared()).unwrap_err();
    assert!(matches!(err, ChargerError::Config { .. }));
}

#[test]
fn invalid_parameters_rejected_before_any_command() {
    let config = ChargingConfig {
        cv: crate::config::CvConfig {
            voltage: -1.0,
            ..Default::default()
        },
        ..ChargingConfig::default()
    };
    let (mut mode, mut psu, _clock) = setup("cv", &config);
    let err = mode.start(&mut psu).unwrap_err();
    assert!(matches!(err, ChargerError::Config { .. }));
    assert!(psu.commands().is_empty());
    assert_eq!(mode.lifecycle(), Lifecycle::Idle);
}

#[test]
fn rejected_setpoint_moves_to_error() {
    let (mut mode, mut psu, _clock) = setup("IUoU", &ChargingConfig::default());
    psu.fail_writes(true);
    let err = mode.start(&mut psu).unwrap_err();
    assert!(err.is_hardware());
    assert_eq!(mode.lifecycle(), Lifecycle::Error);
}

#[test]
fn iuou_start_issues_bulk_setpoints() {
    let (mode, psu, _clock) = started("IUoU", &ChargingConfig::default());
    assert_eq!(mode.lifecycle(), Lifecycle::Charging);
    let commands = psu.commands();
    assert_eq!(commands[0], SupplyCommand::SetCurrent(5.0));
    assert_eq!(commands[1], SupplyCommand::SetVoltage(14.4));
    assert_eq!(commands[2], SupplyCommand::SetOutput(true));
    assert_eq!(commands[3], SupplyCommand::Display("BULK 5.0A".to_string()));
    assert_eq!(mode.status().stage(), Some(IuouStage::Bulk));
}

#[test]
fn iuou_bulk_to_absorption_near_target_voltage() {
    let (mut mode, mut psu, _clock) = started("IUoU", &ChargingConfig::default());
    psu.set_reading(14.2, 5.0);
    assert_eq!(mode.update(&mut psu).stage(), Some(IuouStage::Bulk));
    psu.set_reading(14.35, 5.0);
    let status = mode.update(&mut psu);
    assert_eq!(status.stage(), Some(IuouStage::Absorption));
    assert_eq!(status.state, Lifecycle::Charging);
    assert!((status.voltage - 14.35).abs() < 1e-9);
    assert_eq!(
        psu.commands().last(),
        Some(&SupplyCommand::Display("ABS 14.4V".to_string()))
    );
}

fn in_absorption() -> (ChargingMode, MockSupply, ManualClock) {
    let (mut mode, mut psu, clock) = started("IUoU", &ChargingConfig::default());
    psu.set_reading(14.4, 3.0);
    mode.update(&mut psu);
    assert_eq!(mode.status().stage(), Some(IuouStage::Absorption));
    (mode, psu, clock)
}

#[test]
fn iuou_absorption_ends_on_current_taper() {
    let (mut mode, mut psu, clock) = in_absorption();
    clock.advance(60.0);
    psu.set_reading(14.4, 0.9);
    let status = mode.update(&mut psu);
    assert_eq!(status.stage(), Some(IuouStage::Float));
    assert_eq!(psu.last_voltage_setpoint(), Some(13.6));
}

#[test]
fn iuou_absorption_ends_on_timeout() {
    let (mut mode, mut psu, clock) = in_absorption();
    clock.advance(7_200.0);
    psu.set_reading(14.4, 3.0);
    assert_eq!(mode.update(&mut psu).stage(), Some(IuouStage::Absorption));
    clock.advance(1.0);
    assert_eq!(mode.update(&mut psu).stage(), Some(IuouStage::Float));
}

#[test]
fn iuou_without_float_completes_with_output_off() {
    let config = ChargingConfig {
        iuou: IuouConfig {
            enable_float: false,
            ..IuouConfig::default()
        },
        ..ChargingConfig::default()
    };
    let (mut mode, mut psu, _clock) = started("IUoU", &config);
    psu.set_reading(14.4, 3.0);
    mode.update(&mut psu);
    psu.set_reading(14.4, 0.5);
    let status = mode.update(&mut psu);
    assert_eq!(status.state, Lifecycle::Completed);
    assert!(!psu.output_enabled());
    assert_eq!(psu.output_off_count(), 1);
}

#[test]
fn cv_completes_when_current_drops() {
    let (mut mode, mut psu, _clock) = started("CV", &ChargingConfig::default());
    psu.set_reading(13.8, 0.6);
    assert_eq!(mode.update(&mut psu).state, Lifecycle::Charging);
    psu.set_reading(13.8, 0.4);
    assert_eq!(mode.update(&mut psu).state, Lifecycle::Completed);
    assert_eq!(mode.status().min_current(), Some(0.5));
}

#[test]
fn cc_never_completes_on_its_own() {
    let (mut mode, mut psu, clock) = started("CC", &ChargingConfig::default());
    for voltage in [12.5, 14.4, 16.0, 17.9, 18.5] {
        clock.advance(86_400.0);
        psu.set_reading(voltage, 0.0);
        assert_eq!(mode.update(&mut psu).state, Lifecycle::Charging);
    }
    assert_eq!(psu.last_current_setpoint(), Some(4.4));
    assert_eq!(psu.last_voltage_setpoint(), Some(18.0));
}

fn pulse_config(max_cycles: u32) -> ChargingConfig {
    ChargingConfig {
        pulse: PulseConfig {
            pulse_duration: 10.0,
            rest_duration: 20.0,
            max_cycles,
            ..PulseConfig::default()
        },
        ..ChargingConfig::default()
    }
}

/// Drive one full pulse+rest pair
fn pulse_pair(mode: &mut ChargingMode, psu: &mut MockSupply, clock: &ManualClock) -> Lifecycle {
    clock.advance(10.0);
    mode.update(psu);
    clock.advance(20.0);
    mode.update(psu).state
}

#[test]
fn pulse_completes_after_exactly_max_cycles() {
    let (mut mode, mut psu, clock) = started("Pulse", &pulse_config(3));
    psu.set_reading(15.0, 2.0);

    assert_eq!(pulse_pair(&mut mode, &mut psu, &clock), Lifecycle::Charging);
    assert_eq!(pulse_pair(&mut mode, &mut psu, &clock), Lifecycle::Charging);
    assert!(psu.output_enabled());
    assert_eq!(pulse_pair(&mut mode, &mut psu, &clock), Lifecycle::Completed);
    assert!(!psu.output_enabled());

    // Further ticks change nothing
    let commands = psu.commands().len();
    assert_eq!(pulse_pair(&mut mode, &mut psu, &clock), Lifecycle::Completed);
    assert_eq!(psu.commands().len(), commands);
}

#[test]
fn pulse_rest_phase_uses_low_current() {
    let (mut mode, mut psu, clock) = started("Pulse", &pulse_config(3));
    psu.set_reading(15.0, 2.0);
    clock.advance(10.0);
    let status = mode.update(&mut psu);
    assert!(matches!(
        status.detail,
        ModeDetail::Pulse {
            phase: PulsePhase::Rest,
            cycle: 0,
            ..
        }
    ));
    assert_eq!(psu.last_voltage_setpoint(), Some(13.0));
    assert_eq!(psu.last_current_setpoint(), Some(0.1));
}

#[test]
fn trickle_holds_until_stopped() {
    let (mut mode, mut psu, clock) = started("trickle", &ChargingConfig::default());
    clock.advance(1_000_000.0);
    psu.set_reading(13.5, 0.1);
    assert_eq!(mode.update(&mut psu).state, Lifecycle::Charging);
    mode.stop(&mut psu);
    assert_eq!(mode.lifecycle(), Lifecycle::Stopped);
}

#[test]
fn conditioning_reports_progress_and_completes() {
    let (mut mode, mut psu, clock) = started("Conditioning", &ChargingConfig::default());
    psu.set_reading(15.5, 0.5);
    clock.advance(43_200.0);
    let status = mode.update(&mut psu);
    match status.detail {
        ModeDetail::Conditioning { progress, .. } => assert!((progress - 50.0).abs() < 1e-6),
        other => panic!("unexpected detail {:?}", other),
    }
    clock.advance(43_200.0);
    assert_eq!(mode.update(&mut psu).state, Lifecycle::Completed);
    assert!(!psu.output_enabled());
}

#[test]
fn conditioning_flags_sustained_high_current() {
    let (mut mode, mut psu, clock) = started("Conditioning", &ChargingConfig::default());
    psu.set_reading(15.5, 2.0);
    assert!(!mode.update(&mut psu).electrolysis_warning());
    clock.advance(3_601.0);
    assert!(mode.update(&mut psu).electrolysis_warning());
    psu.set_reading(15.5, 0.5);
    assert!(!mode.update(&mut psu).electrolysis_warning());
}

#[test]
fn read_failure_moves_to_error_and_keeps_last_snapshot() {
    let (mut mode, mut psu, _clock) = started("CV", &ChargingConfig::default());
    psu.set_reading(13.7, 2.0);
    mode.update(&mut psu);
    psu.fail_reads(true);
    let status = mode.update(&mut psu);
    assert_eq!(status.state, Lifecycle::Error);
    assert!((status.voltage - 13.7).abs() < 1e-9);
}

#[test]
fn update_outside_charging_is_noop() {
    let (mut mode, mut psu, _clock) = setup("CV", &ChargingConfig::default());
    let status = mode.update(&mut psu);
    assert_eq!(status.state, Lifecycle::Idle);
    assert!(psu.commands().is_empty());
}

#[test]
fn stop_from_any_state_disables_output_once() {
    // Charging
    let (mut mode, mut psu, _clock) = started("CC", &ChargingConfig::default());
    mode.stop(&mut psu);
    mode.stop(&mut psu);
    assert_eq!(psu.output_off_count(), 1);
    assert_eq!(mode.lifecycle(), Lifecycle::Stopped);

    // Error
    let (mut mode, mut psu, _clock) = started("CC", &ChargingConfig::default());
    psu.fail_reads(true);
    mode.update(&mut psu);
    assert_eq!(mode.lifecycle(), Lifecycle::Error);
    mode.stop(&mut psu);
    assert_eq!(psu.output_off_count(), 1);
    assert_eq!(mode.lifecycle(), Lifecycle::Stopped);

    // Idle
    let (mut mode, mut psu, _clock) = setup("CC", &ChargingConfig::default());
    mode.stop(&mut psu);
    assert_eq!(psu.output_off_count(), 1);
    assert_eq!(mode.lifecycle(), Lifecycle::Stopped);
}

#[test]
fn stop_retries_until_output_off_is_confirmed() {
    let (mut mode, mut psu, _clock) = started("CC", &ChargingConfig::default());
    psu.fail_writes(true);
    mode.stop(&mut psu);
    assert_eq!(mode.lifecycle(), Lifecycle::Stopped);
    assert!(psu.output_enabled());
    psu.fail_writes(false);
    mode.stop(&mut psu);
    assert!(!psu.output_enabled());
    assert_eq!(psu.output_off_count(), 1);
}

#[test]
fn display_failures_do_not_affect_charging() {
    let (mut mode, mut psu, _clock) = setup("IUoU", &ChargingConfig::default());
    psu.fail_display(true);
    mode.start(&mut psu).unwrap();
    assert_eq!(mode.lifecycle(), Lifecycle::Charging);
}

#[test]
fn restart_resets_substate() {
    let (mut mode, mut psu, _clock) = in_absorption();
    mode.stop(&mut psu);
    mode.start(&mut psu).unwrap();
    assert_eq!(mode.status().stage(), Some(IuouStage::Bulk));
    assert!(mode.start(&mut psu).is_err());
}

#[test]
fn elapsed_counts_from_start() {
    let (mode, _psu, clock) = started("Trickle", &ChargingConfig::default());
    clock.advance(42.0);
    assert!((mode.elapsed() - 42.0).abs() < 1e-9);
    assert!((mode.status().elapsed - 42.0).abs() < 1e-9);
}

#[test]
fn set_current_rejects_negative() {
    let (mut mode, mut psu, _clock) = started("CC", &ChargingConfig::default());
    assert!(mode.set_current(&mut psu, -1.0).is_err());
    mode.set_current(&mut psu, 2.5).unwrap();
    assert_eq!(psu.last_current_setpoint(), Some(2.5));
}
