//! Scripted power supply used by tests and dry runs.
//!
//! Clones share one state, so a test can hand a clone to the driver and keep
//! another to script measurements and inspect the commands that were sent.

use super::PowerSupply;
use crate::error::{ChargerError, Result};
use std::sync::{Arc, Mutex, MutexGuard};

/// Command recorded by [`MockSupply`]
#[derive(Debug, Clone, PartialEq)]
pub enum SupplyCommand {
    SetVoltage(f64),
    SetCurrent(f64),
    SetOutput(bool),
    Display(String),
}

#[derive(Debug, Default)]
struct MockState {
    voltage: f64,
    current: f64,
    power: Option<f64>,
    output: bool,
    connected: bool,
    fail_reads: bool,
    fail_writes: bool,
    fail_display: bool,
    reconnect_attempts: u32,
    commands: Vec<SupplyCommand>,
}

/// In-memory power supply
#[derive(Debug, Clone)]
pub struct MockSupply {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockSupply {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSupply {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                connected: true,
                ..MockState::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Script the next measurements; power follows as V×I unless overridden
    pub fn set_reading(&self, voltage: f64, current: f64) {
        let mut s = self.lock();
        s.voltage = voltage;
        s.current = current;
        s.power = None;
    }

    pub fn set_power(&self, power: f64) {
        self.lock().power = Some(power);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    pub fn fail_display(&self, fail: bool) {
        self.lock().fail_display = fail;
    }

    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    pub fn output_enabled(&self) -> bool {
        self.lock().output
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.lock().reconnect_attempts
    }

    /// Every command sent so far, in order
    pub fn commands(&self) -> Vec<SupplyCommand> {
        self.lock().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.lock().commands.clear();
    }

    /// Number of set_output(false) commands received
    pub fn output_off_count(&self) -> usize {
        self.lock()
            .commands
            .iter()
            .filter(|c| matches!(c, SupplyCommand::SetOutput(false)))
            .count()
    }

    /// Most recent voltage set-point
    pub fn last_voltage_setpoint(&self) -> Option<f64> {
        self.lock().commands.iter().rev().find_map(|c| match c {
            SupplyCommand::SetVoltage(v) => Some(*v),
            _ => None,
        })
    }

    /// Most recent current set-point
    pub fn last_current_setpoint(&self) -> Option<f64> {
        self.lock().commands.iter().rev().find_map(|c| match c {
            SupplyCommand::SetCurrent(a) => Some(*a),
            _ => None,
        })
    }

    fn write(&self, command: SupplyCommand) -> Result<()> {
        let mut s = self.lock();
        if s.fail_writes || !s.connected {
            return Err(ChargerError::hardware("mock supply rejected write"));
        }
        if let SupplyCommand::SetOutput(enabled) = command {
            s.output = enabled;
        }
        s.commands.push(command);
        Ok(())
    }

    fn read(&self, pick: impl FnOnce(&MockState) -> f64) -> Result<f64> {
        let s = self.lock();
        if s.fail_reads || !s.connected {
            return Err(ChargerError::hardware("mock supply read failed"));
        }
        Ok(pick(&s))
    }
}

impl PowerSupply for MockSupply {
    fn set_voltage(&mut self, volts: f64) -> Result<()> {
        self.write(SupplyCommand::SetVoltage(volts))
    }

    fn set_current(&mut self, amps: f64) -> Result<()> {
        self.write(SupplyCommand::SetCurrent(amps))
    }

    fn set_output(&mut self, enabled: bool) -> Result<()> {
        self.write(SupplyCommand::SetOutput(enabled))
    }

    fn measure_voltage(&mut self) -> Result<f64> {
        self.read(|s| s.voltage)
    }

    fn measure_current(&mut self) -> Result<f64> {
        self.read(|s| s.current)
    }

    fn measure_power(&mut self) -> Result<f64> {
        self.read(|s| s.power.unwrap_or(s.voltage * s.current))
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    fn reconnect(&mut self) -> Result<()> {
        let mut s = self.lock();
        s.reconnect_attempts += 1;
        if s.fail_writes {
            return Err(ChargerError::hardware("mock supply reconnect failed"));
        }
        s.connected = true;
        Ok(())
    }

    fn set_display_text(&mut self, text: &str) -> Result<()> {
        if self.lock().fail_display {
            return Err(ChargerError::hardware("mock display unavailable"));
        }
        self.write(SupplyCommand::Display(text.to_string()))
    }
}
