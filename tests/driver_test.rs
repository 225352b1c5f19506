use plumbum::clock::ManualClock;
use plumbum::config::Config;
use plumbum::driver::{ChargerDriver, DriverCommand, DriverState};
use plumbum::modes::{IuouStage, Lifecycle, ModeKind};
use plumbum::psu::{MockSupply, TemperatureSensor};
use plumbum::session::EndReason;
use std::time::Duration;

fn driver_with(config: Config) -> (ChargerDriver, MockSupply, ManualClock) {
    let clock = ManualClock::new(1_000.0);
    let psu = MockSupply::new();
    let driver = ChargerDriver::new(config, Box::new(psu.clone()), clock.shared()).unwrap();
    (driver, psu, clock)
}

fn started(config: Config) -> (ChargerDriver, MockSupply, ManualClock) {
    let (mut driver, psu, clock) = driver_with(config);
    psu.set_reading(12.6, 5.0);
    driver.command_sender().send(DriverCommand::Start).unwrap();
    driver.tick();
    assert!(driver.is_charging());
    (driver, psu, clock)
}

struct FixedTemperature(f64);

impl TemperatureSensor for FixedTemperature {
    fn read_celsius(&mut self) -> Option<f64> {
        Some(self.0)
    }
}

#[test]
fn invalid_config_is_rejected() {
    let mut config = Config::default();
    config.charging.default_mode = "Boost".to_string();
    let clock = ManualClock::new(0.0);
    assert!(ChargerDriver::new(config, Box::new(MockSupply::new()), clock.shared()).is_err());
}

#[test]
fn start_command_applies_at_next_tick() {
    let (mut driver, psu, _clock) = driver_with(Config::default());
    psu.set_reading(12.6, 5.0);
    driver.command_sender().send(DriverCommand::Start).unwrap();
    assert!(!driver.is_charging());
    assert!(psu.commands().is_empty());

    let snapshot = driver.tick();
    assert!(driver.is_charging());
    assert!(snapshot.session_id.is_some());
    let mode = snapshot.mode.as_ref().unwrap();
    assert_eq!(mode.mode, ModeKind::Iuou);
    assert_eq!(mode.state, Lifecycle::Charging);
    assert_eq!(mode.stage(), Some(IuouStage::Bulk));
    assert!(snapshot.safety.as_ref().unwrap().safe);
    assert!(psu.output_enabled());
    assert_eq!(driver.get_state(), DriverState::Running);
}

#[test]
fn over_voltage_ends_session_in_same_tick() {
    let (mut driver, psu, _clock) = started(Config::default());
    psu.set_reading(16.5, 2.0);
    let snapshot = driver.tick();

    assert_eq!(snapshot.session_end, Some(EndReason::SafetyViolation));
    assert!(snapshot.safety.as_ref().unwrap().should_stop);
    assert!(!driver.is_charging());
    assert!(!psu.output_enabled());
    assert_eq!(psu.output_off_count(), 1);
    let last = driver.sessions().last_session.as_ref().unwrap();
    assert_eq!(last.end_reason, Some(EndReason::SafetyViolation));
}

#[test]
fn over_temperature_ends_session() {
    let mut config = Config::default();
    config.safety.max_temperature = Some(45.0);
    let clock = ManualClock::new(0.0);
    let psu = MockSupply::new();
    psu.set_reading(13.0, 2.0);
    let mut driver = ChargerDriver::new(config, Box::new(psu.clone()), clock.shared())
        .unwrap()
        .with_temperature_sensor(Box::new(FixedTemperature(50.0)));
    driver.command_sender().send(DriverCommand::Start).unwrap();
    let snapshot = driver.tick();
    assert_eq!(snapshot.temperature, Some(50.0));
    assert_eq!(snapshot.session_end, Some(EndReason::SafetyViolation));
    assert!(!psu.output_enabled());
}

#[test]
fn cc_session_ends_on_voltage_plateau() {
    let mut config = Config::default();
    config.charging.default_mode = "CC".to_string();
    config.safety.absolute_max_voltage = 18.5;
    let (mut driver, psu, clock) = started(config);
    psu.set_reading(16.1, 4.4);

    let mut end = None;
    for _ in 0..200 {
        clock.advance(5.0);
        let snapshot = driver.tick();
        if let Some(reason) = snapshot.session_end {
            end = Some(reason);
            assert!(snapshot.plateau.unwrap().is_plateau);
            break;
        }
    }
    assert_eq!(end, Some(EndReason::Plateau));
    let last = driver.sessions().last_session.as_ref().unwrap();
    assert!(last.duration_secs >= 900.0);
    assert!(last.energy.ah_delivered > 0.0);
    assert!(!psu.output_enabled());
}

#[test]
fn cv_session_ends_when_current_tapers() {
    let mut config = Config::default();
    config.charging.default_mode = "CV".to_string();
    let (mut driver, psu, clock) = started(config);
    psu.set_reading(13.8, 0.4);
    clock.advance(5.0);
    let snapshot = driver.tick();
    assert_eq!(snapshot.session_end, Some(EndReason::Completed));
    assert!(!driver.is_charging());
}

#[test]
fn mode_completion_keeps_completed_state_and_single_output_off() {
    let mut config = Config::default();
    config.charging.iuou.enable_float = false;
    let (mut driver, psu, clock) = started(config);

    psu.set_reading(14.35, 3.0);
    clock.advance(5.0);
    driver.tick();
    psu.set_reading(14.4, 0.5);
    clock.advance(5.0);
    let snapshot = driver.tick();

    assert_eq!(snapshot.session_end, Some(EndReason::Completed));
    assert_eq!(psu.output_off_count(), 1);
    assert_eq!(driver.mode().unwrap().lifecycle(), Lifecycle::Completed);

    driver.shutdown();
    assert_eq!(psu.output_off_count(), 1);
}

#[test]
fn hardware_error_ends_session() {
    let (mut driver, psu, _clock) = started(Config::default());
    psu.fail_reads(true);
    let snapshot = driver.tick();
    assert_eq!(snapshot.session_end, Some(EndReason::HardwareError));
    assert_eq!(snapshot.mode.as_ref().unwrap().state, Lifecycle::Error);
    assert!(matches!(driver.get_state(), DriverState::Error(_)));
    assert!(!psu.output_enabled());
}

#[test]
fn failed_start_leaves_charger_idle() {
    let (mut driver, psu, _clock) = driver_with(Config::default());
    psu.fail_writes(true);
    driver.command_sender().send(DriverCommand::Start).unwrap();
    driver.tick();
    assert!(!driver.is_charging());
    assert!(!driver.sessions().has_active_session());
    assert!(matches!(driver.get_state(), DriverState::Error(_)));
}

#[test]
fn stop_command_disables_output_once() {
    let (mut driver, psu, _clock) = started(Config::default());
    let tx = driver.command_sender();
    tx.send(DriverCommand::Stop).unwrap();
    let snapshot = driver.tick();
    assert_eq!(snapshot.session_end, Some(EndReason::UserStop));
    assert_eq!(psu.output_off_count(), 1);

    tx.send(DriverCommand::Stop).unwrap();
    driver.tick();
    assert_eq!(psu.output_off_count(), 1);
    assert_eq!(driver.mode().unwrap().lifecycle(), Lifecycle::Stopped);
}

#[test]
fn mode_change_stops_active_session() {
    let (mut driver, _psu, _clock) = started(Config::default());
    let tx = driver.command_sender();

    tx.send(DriverCommand::SetMode("cv".to_string())).unwrap();
    let snapshot = driver.tick();
    assert_eq!(snapshot.session_end, Some(EndReason::ModeChange));
    assert!(!driver.is_charging());
    assert_eq!(driver.mode().unwrap().kind(), ModeKind::Cv);

    tx.send(DriverCommand::SetMode("Boost".to_string())).unwrap();
    driver.tick();
    assert_eq!(driver.mode().unwrap().kind(), ModeKind::Cv);

    tx.send(DriverCommand::Start).unwrap();
    let snapshot = driver.tick();
    assert!(driver.is_charging());
    assert_eq!(snapshot.mode.as_ref().unwrap().mode, ModeKind::Cv);
}

#[test]
fn current_override_is_clamped() {
    let (mut driver, psu, _clock) = started(Config::default());
    driver
        .command_sender()
        .send(DriverCommand::SetCurrent(9.0))
        .unwrap();
    driver.tick();
    assert_eq!(psu.last_current_setpoint(), Some(5.0));

    driver
        .command_sender()
        .send(DriverCommand::SetCurrent(2.0))
        .unwrap();
    driver.tick();
    assert_eq!(psu.last_current_setpoint(), Some(2.0));
}

#[test]
fn dropped_supply_is_reconnected() {
    let (mut driver, psu, _clock) = driver_with(Config::default());
    psu.set_connected(false);
    let snapshot = driver.tick();
    assert!(snapshot.psu_connected);
    assert_eq!(psu.reconnect_attempts(), 1);
    assert_eq!(driver.recovery().reconnect_count(), 1);
}

#[test]
fn snapshot_is_published_on_both_channels() {
    let (mut driver, psu, _clock) = driver_with(Config::default());
    psu.set_reading(12.6, 5.0);
    let mut status = driver.subscribe_status();
    let latest = driver.watch_snapshot();

    driver.command_sender().send(DriverCommand::Start).unwrap();
    let snapshot = driver.tick();

    let json = status.try_recv().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["mode"]["mode"], "IUoU");
    assert_eq!(value["mode"]["state"], "charging");
    assert_eq!(value["total_ticks"], 1);
    assert_eq!(latest.borrow().session_id, snapshot.session_id);
}

#[tokio::test]
async fn run_until_shutdown_forces_output_off() {
    let mut config = Config::default();
    config.safety.measurement_interval = 0.01;
    let (mut driver, psu, _clock) = driver_with(config);
    psu.set_reading(12.6, 3.0);
    driver.command_sender().send(DriverCommand::Start).unwrap();

    let shutdown = driver.shutdown_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.send(()).ok();
    });

    driver.run().await.unwrap();

    assert!(!psu.output_enabled());
    assert_eq!(driver.get_state(), DriverState::ShuttingDown);
    let last = driver.sessions().last_session.as_ref().unwrap();
    assert_eq!(last.end_reason, Some(EndReason::Shutdown));
}
