#![no_main]
use libfuzzer_sys::fuzz_target;
use plumbum::{ManualClock, SafetyLimits, SafetyMonitor};

fuzz_target!(|data: &[u8]| {
    // Interpret the input as (dt, voltage, current) triples of f32
    let clock = ManualClock::new(0.0);
    let mut monitor = SafetyMonitor::new(SafetyLimits::default(), clock.shared());
    monitor.start_monitoring();

    let mut last_ah = 0.0;
    for chunk in data.chunks_exact(12) {
        let word = |i: usize| f32::from_le_bytes([chunk[i], chunk[i + 1], chunk[i + 2], chunk[i + 3]]);
        let (dt, voltage, current) = (word(0), word(4), word(8));
        if !(dt.is_finite() && voltage.is_finite() && current.is_finite()) {
            continue;
        }
        clock.advance(f64::from(dt.abs()));
        let (voltage, current) = (f64::from(voltage), f64::from(current.abs()));

        let verdict = monitor.check_safety(voltage, current, None);
        assert_eq!(verdict.safe, verdict.violations.is_empty());
        let _ = monitor.check_voltage_plateau(voltage);
        let energy = monitor.update_energy_accounting(current, voltage.abs() * current);
        assert!(energy.ah_delivered >= last_ah);
        last_ah = energy.ah_delivered;
    }
});
