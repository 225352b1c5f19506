//! Power supply seam
//!
//! The wire-protocol driver for a programmable DC supply lives outside this
//! crate. Everything here talks to it through the synchronous [`PowerSupply`]
//! trait: a bounded round trip per call, any of which may fail.

use crate::error::Result;
use serde::{Deserialize, Serialize};

pub mod mock;
#[cfg(feature = "sim")]
pub mod sim;

pub use mock::{MockSupply, SupplyCommand};
#[cfg(feature = "sim")]
pub use sim::SimulatedSupply;

/// Longest text most supply front panels accept
pub const DISPLAY_TEXT_MAX: usize = 16;

/// Programmable DC power supply
pub trait PowerSupply: Send {
    /// Voltage set-point (V)
    fn set_voltage(&mut self, volts: f64) -> Result<()>;

    /// Current limit (A)
    fn set_current(&mut self, amps: f64) -> Result<()>;

    fn set_output(&mut self, enabled: bool) -> Result<()>;

    fn measure_voltage(&mut self) -> Result<f64>;

    fn measure_current(&mut self) -> Result<f64>;

    fn measure_power(&mut self) -> Result<f64>;

    /// Optional link status. Default: assume connected.
    fn is_connected(&self) -> bool {
        true
    }

    /// Re-open the link after a disconnect
    fn reconnect(&mut self) -> Result<()> {
        Ok(())
    }

    /// Short status text on the front panel, if the model has one
    fn set_display_text(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }
}

/// One tick's worth of measurements
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerReading {
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
}

impl PowerReading {
    /// Sample voltage, current and power in that order
    pub fn sample(psu: &mut dyn PowerSupply) -> Result<Self> {
        let voltage = psu.measure_voltage()?;
        let current = psu.measure_current()?;
        let power = psu.measure_power()?;
        Ok(Self {
            voltage,
            current,
            power,
        })
    }
}

/// Battery temperature probe
pub trait TemperatureSensor: Send {
    /// Temperature in °C, `None` when no valid reading is available
    fn read_celsius(&mut self) -> Option<f64>;
}

/// Truncate panel text to what the display accepts, on a char boundary
pub fn clip_display_text(text: &str) -> &str {
    match text.char_indices().nth(DISPLAY_TEXT_MAX) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
