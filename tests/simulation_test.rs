#![cfg(feature = "sim")]

use plumbum::clock::ManualClock;
use plumbum::config::Config;
use plumbum::driver::{ChargerDriver, DriverCommand};
use plumbum::modes::IuouStage;
use plumbum::psu::SimulatedSupply;
use plumbum::session::EndReason;

#[test]
fn iuou_charges_simulated_battery_to_completion() {
    let mut config = Config::default();
    config.charging.iuou.enable_float = false;
    let clock = ManualClock::new(0.0);
    let psu = SimulatedSupply::new(&config.simulation, clock.shared());
    let mut driver = ChargerDriver::new(config, Box::new(psu), clock.shared()).unwrap();
    driver.command_sender().send(DriverCommand::Start).unwrap();

    let mut saw_absorption = false;
    let mut end = None;
    for _ in 0..720 {
        let snapshot = driver.tick();
        if snapshot.mode.as_ref().and_then(|m| m.stage()) == Some(IuouStage::Absorption) {
            saw_absorption = true;
        }
        if let Some(reason) = snapshot.session_end {
            end = Some(reason);
            break;
        }
        clock.advance(60.0);
    }

    assert!(saw_absorption);
    assert_eq!(end, Some(EndReason::Completed));
    let session = driver.sessions().last_session.as_ref().unwrap();
    assert!(session.energy.ah_delivered > 10.0);
    assert!(session.energy.ah_stored < session.energy.ah_delivered);
    assert!(session.end_voltage.unwrap_or_default() > 14.0);
}
