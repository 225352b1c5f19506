use crate::error::ChargerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Charging strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModeKind {
    /// Three-stage bulk / absorption / float
    #[serde(rename = "IUoU")]
    Iuou,
    /// Constant voltage
    #[serde(rename = "CV")]
    Cv,
    /// Constant current, completion by voltage plateau
    #[serde(rename = "CC")]
    Cc,
    /// Desulfation pulses
    Pulse,
    /// Low-current maintenance
    Trickle,
    /// Extended high-voltage hold
    Conditioning,
}

impl ModeKind {
    pub const ALL: [Self; 6] = [
        Self::Iuou,
        Self::Cv,
        Self::Cc,
        Self::Pulse,
        Self::Trickle,
        Self::Conditioning,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Iuou => "IUoU",
            Self::Cv => "CV",
            Self::Cc => "CC",
            Self::Pulse => "Pulse",
            Self::Trickle => "Trickle",
            Self::Conditioning => "Conditioning",
        }
    }
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModeKind {
    type Err = ChargerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ChargerError::config(format!("Unknown charging mode: {}", s)))
    }
}

/// Lifecycle shared by every mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Idle,
    Charging,
    Stopped,
    Completed,
    Error,
}

impl Lifecycle {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Charging => "charging",
            Self::Stopped => "stopped",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IUoU stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IuouStage {
    Bulk,
    Absorption,
    Float,
}

impl fmt::Display for IuouStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bulk => "bulk",
            Self::Absorption => "absorption",
            Self::Float => "float",
        })
    }
}

/// Pulse mode phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PulsePhase {
    Pulse,
    Rest,
}

/// Mode-specific part of a status snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModeDetail {
    Iuou {
        stage: IuouStage,
        bulk_current: f64,
        absorption_voltage: f64,
        float_voltage: f64,
        absorption_current_threshold: f64,
    },
    Cv {
        target_voltage: f64,
        min_current: f64,
    },
    Cc {
        target_current: f64,
        max_voltage: f64,
    },
    Pulse {
        phase: PulsePhase,
        cycle: u32,
        max_cycles: u32,
        phase_elapsed: f64,
    },
    Trickle {
        target_voltage: f64,
        target_current: f64,
    },
    Conditioning {
        target_voltage: f64,
        duration: f64,
        progress: f64,
        electrolysis_warning: bool,
    },
}

/// Snapshot returned by every update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeStatus {
    pub mode: ModeKind,
    pub state: Lifecycle,
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    /// Seconds since start()
    pub elapsed: f64,
    pub detail: ModeDetail,
}

impl ModeStatus {
    /// IUoU stage, if this is an IUoU snapshot
    pub const fn stage(&self) -> Option<IuouStage> {
        match self.detail {
            ModeDetail::Iuou { stage, .. } => Some(stage),
            _ => None,
        }
    }

    /// Voltage the bulk stage is driving towards (0 outside IUoU)
    pub const fn target_voltage(&self) -> f64 {
        match self.detail {
            ModeDetail::Iuou {
                absorption_voltage, ..
            } => absorption_voltage,
            _ => 0.0,
        }
    }

    pub const fn absorption_current_threshold(&self) -> Option<f64> {
        match self.detail {
            ModeDetail::Iuou {
                absorption_current_threshold,
                ..
            } => Some(absorption_current_threshold),
            _ => None,
        }
    }

    /// Completion current, only CV carries one
    pub const fn min_current(&self) -> Option<f64> {
        match self.detail {
            ModeDetail::Cv { min_current, .. } => Some(min_current),
            _ => None,
        }
    }

    pub const fn electrolysis_warning(&self) -> bool {
        matches!(
            self.detail,
            ModeDetail::Conditioning {
                electrolysis_warning: true,
                ..
            }
        )
    }
}
