//! First-order lead-acid battery behind a simulated supply.
//!
//! The open-circuit voltage rises linearly with state of charge and steeply
//! once the battery is past 80%, which is enough to walk every charging mode
//! through its transitions without hardware.

use super::PowerSupply;
use crate::clock::SharedClock;
use crate::config::SimulationConfig;
use crate::error::Result;

const OCV_EMPTY: f64 = 11.9;
const OCV_SPAN: f64 = 0.9;
const GASSING_KNEE: f64 = 0.8;
const GASSING_RISE: f64 = 3.5;
const ACCEPTANCE: f64 = 0.9;

pub struct SimulatedSupply {
    clock: SharedClock,
    capacity_ah: f64,
    internal_resistance: f64,
    soc: f64,
    set_voltage: f64,
    set_current: f64,
    output: bool,
    last_update: f64,
}

impl SimulatedSupply {
    pub fn new(config: &SimulationConfig, clock: SharedClock) -> Self {
        let now = clock.now();
        Self {
            clock,
            capacity_ah: config.capacity_ah,
            internal_resistance: config.internal_resistance_ohm,
            soc: config.initial_soc.clamp(0.0, 1.0),
            set_voltage: 0.0,
            set_current: 0.0,
            output: false,
            last_update: now,
        }
    }

    pub const fn state_of_charge(&self) -> f64 {
        self.soc
    }

    fn open_circuit_voltage(&self) -> f64 {
        let gassing = ((self.soc - GASSING_KNEE).max(0.0) / (1.0 - GASSING_KNEE)) * GASSING_RISE;
        OCV_EMPTY + OCV_SPAN * self.soc + gassing
    }

    /// Current the supply pushes at the present set-points
    fn flowing_current(&self) -> f64 {
        if !self.output {
            return 0.0;
        }
        let headroom = self.set_voltage - self.open_circuit_voltage();
        (headroom / self.internal_resistance).clamp(0.0, self.set_current)
    }

    /// Integrate charge since the last call
    fn advance(&mut self) {
        let now = self.clock.now();
        let dt_hours = (now - self.last_update).max(0.0) / 3600.0;
        self.last_update = now;
        let ah = self.flowing_current() * dt_hours * ACCEPTANCE;
        self.soc = (self.soc + ah / self.capacity_ah).min(1.0);
    }

    fn terminal_voltage(&self) -> f64 {
        let ocv = self.open_circuit_voltage();
        if self.output {
            (ocv + self.flowing_current() * self.internal_resistance).min(self.set_voltage.max(ocv))
        } else {
            ocv
        }
    }
}

impl PowerSupply for SimulatedSupply {
    fn set_voltage(&mut self, volts: f64) -> Result<()> {
        self.advance();
        self.set_voltage = volts;
        Ok(())
    }

    fn set_current(&mut self, amps: f64) -> Result<()> {
        self.advance();
        self.set_current = amps.max(0.0);
        Ok(())
    }

    fn set_output(&mut self, enabled: bool) -> Result<()> {
        self.advance();
        self.output = enabled;
        Ok(())
    }

    fn measure_voltage(&mut self) -> Result<f64> {
        self.advance();
        Ok(self.terminal_voltage())
    }

    fn measure_current(&mut self) -> Result<f64> {
        self.advance();
        Ok(self.flowing_current())
    }

    fn measure_power(&mut self) -> Result<f64> {
        self.advance();
        Ok(self.terminal_voltage() * self.flowing_current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn charge_raises_state_of_charge_and_voltage() {
        let clock = ManualClock::new(0.0);
        let mut sim = SimulatedSupply::new(&SimulationConfig::default(), clock.shared());
        let v0 = sim.measure_voltage().unwrap();
        sim.set_voltage(14.4).unwrap();
        sim.set_current(5.0).unwrap();
        sim.set_output(true).unwrap();
        assert!((sim.measure_current().unwrap() - 5.0).abs() < 1e-9);

        clock.advance(3600.0);
        sim.measure_voltage().unwrap();
        let soc = sim.state_of_charge();
        assert!(soc > 0.5);
        sim.set_output(false).unwrap();
        assert!(sim.measure_voltage().unwrap() > v0);
        assert_eq!(sim.measure_current().unwrap(), 0.0);
    }

    #[test]
    fn current_tapers_near_set_voltage() {
        let clock = ManualClock::new(0.0);
        let config = SimulationConfig {
            initial_soc: 0.886,
            ..SimulationConfig::default()
        };
        let mut sim = SimulatedSupply::new(&config, clock.shared());
        sim.set_voltage(14.4).unwrap();
        sim.set_current(5.0).unwrap();
        sim.set_output(true).unwrap();
        let current = sim.measure_current().unwrap();
        assert!(current < 5.0);
        assert!(sim.measure_voltage().unwrap() <= 14.4 + 1e-9);
    }
}
