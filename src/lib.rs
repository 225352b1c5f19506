//! # Plumbum - Lead-Acid Battery Charger Controller
//!
//! Drives a programmable DC power supply to charge 12 V lead-acid batteries,
//! choosing among several charging strategies, enforcing hard safety limits
//! and estimating delivered charge.
//!
//! ## Features
//!
//! - **Charging Modes**: IUoU (bulk/absorption/float), CV, CC, Pulse
//!   (desulfation), Trickle and high-voltage Conditioning
//! - **Safety Engine**: Voltage, current, duration and temperature limits
//!   checked every tick
//! - **Plateau Detection**: Full-charge detection above normal absorption
//!   voltages
//! - **Energy Accounting**: Coulomb counting of Ah and Wh delivered
//! - **Single-Owner Control Loop**: Commands are queued and applied at tick
//!   boundaries
//! - **Configuration**: YAML-based configuration with validation
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing
//! - `clock`: Time source shared by every deadline
//! - `psu`: Power supply and temperature sensor seams, mock and simulator
//! - `modes`: Charging mode state machine
//! - `safety`: Safety limits, plateau detection, energy accounting
//! - `session`: Charge session tracking
//! - `driver`: Control loop, command queue and telemetry

pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod modes;
pub mod psu;
pub mod safety;
pub mod session;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::Config;
pub use driver::{ChargerDriver, ChargerSnapshot, DriverCommand};
pub use error::{ChargerError, Result};
pub use modes::{ChargingMode, Lifecycle, ModeKind, ModeStatus};
pub use psu::{PowerReading, PowerSupply, TemperatureSensor};
pub use safety::{SafetyLimits, SafetyMonitor};
