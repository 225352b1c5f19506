use crate::modes::ModeStatus;
use crate::safety::{EnergySummary, PlateauVerdict, SafetyVerdict};
use crate::session::EndReason;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Main driver state
#[derive(Debug, Clone, PartialEq)]
pub enum DriverState {
    /// Driver is initializing
    Initializing,
    /// Driver is running normally
    Running,
    /// Last session ended on a hardware fault
    Error(String),
    /// Driver is shutting down
    ShuttingDown,
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initializing => f.write_str("Initializing"),
            Self::Running => f.write_str("Running"),
            Self::Error(reason) => write!(f, "Error: {}", reason),
            Self::ShuttingDown => f.write_str("ShuttingDown"),
        }
    }
}

/// Commands accepted by the driver; applied at the next tick
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCommand {
    /// Start charging with the selected (or default) mode
    Start,
    Stop,
    /// Select a mode by name; stops an active session first
    SetMode(String),
    /// Override the current limit of the running mode (A)
    SetCurrent(f64),
}

/// Telemetry published after every tick
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChargerSnapshot {
    /// RFC 3339 wall-clock time of the tick
    pub timestamp: String,
    pub driver_state: String,
    /// Mode status as returned by this tick's update
    pub mode: Option<ModeStatus>,
    pub safety: Option<SafetyVerdict>,
    pub plateau: Option<PlateauVerdict>,
    pub energy: EnergySummary,
    /// Display-only estimate, 0 to 100
    pub progress: f64,
    pub temperature: Option<f64>,
    pub session_id: Option<String>,
    /// Set on the tick that ended the session
    pub session_end: Option<EndReason>,
    pub psu_connected: bool,
    pub total_ticks: u64,
}
