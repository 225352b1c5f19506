//! Charge session tracking
//!
//! One session spans a start command up to the tick that ends charging. The
//! summary records what was delivered and why it ended; history is kept in
//! memory only.

use crate::error::{ChargerError, Result};
use crate::logging::{StructuredLogger, get_logger};
use crate::modes::ModeKind;
use crate::safety::EnergySummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The mode (or the completion check) reported a full charge
    Completed,
    /// Voltage stopped rising above the plateau threshold
    Plateau,
    SafetyViolation,
    HardwareError,
    UserStop,
    /// Stopped to switch to another mode
    ModeChange,
    Shutdown,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Completed => "completed",
            Self::Plateau => "plateau",
            Self::SafetyViolation => "safety_violation",
            Self::HardwareError => "hardware_error",
            Self::UserStop => "user_stop",
            Self::ModeChange => "mode_change",
            Self::Shutdown => "shutdown",
        })
    }
}

/// Charge session record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeSession {
    /// Unique session ID
    pub id: String,

    pub mode: ModeKind,

    pub start_time: DateTime<Utc>,

    pub end_time: Option<DateTime<Utc>>,

    /// Battery voltage at the first tick (V)
    pub start_voltage: f64,

    pub end_voltage: Option<f64>,

    /// Charging time as measured by the control loop (s)
    pub duration_secs: f64,

    pub peak_power_w: f64,

    pub energy: EnergySummary,

    /// Set once the session has ended
    pub end_reason: Option<EndReason>,
}

impl ChargeSession {
    pub const fn is_active(&self) -> bool {
        self.end_reason.is_none()
    }
}

/// Tracks the current session and a bounded history of finished ones
pub struct ChargeSessionManager {
    /// Current active session
    pub current_session: Option<ChargeSession>,

    /// Last completed session
    pub last_session: Option<ChargeSession>,

    session_history: VecDeque<ChargeSession>,

    max_history_size: usize,

    logger: StructuredLogger,
}

impl ChargeSessionManager {
    pub fn new(max_history_size: usize) -> Self {
        Self {
            current_session: None,
            last_session: None,
            session_history: VecDeque::with_capacity(max_history_size),
            max_history_size,
            logger: get_logger("session"),
        }
    }

    /// Open a session; returns its id
    pub fn start_session(&mut self, mode: ModeKind, start_voltage: f64) -> Result<String> {
        if self.current_session.is_some() {
            return Err(ChargerError::generic("Session already active"));
        }

        let session = ChargeSession {
            id: uuid::Uuid::new_v4().to_string(),
            mode,
            start_time: Utc::now(),
            end_time: None,
            start_voltage,
            end_voltage: None,
            duration_secs: 0.0,
            peak_power_w: 0.0,
            energy: EnergySummary::default(),
            end_reason: None,
        };

        self.logger.info(&format!(
            "Started {} session {} at {:.2}V",
            mode, session.id, start_voltage
        ));
        let id = session.id.clone();
        self.current_session = Some(session);
        Ok(id)
    }

    /// Fold one tick's figures into the active session
    pub fn update(&mut self, power_w: f64, duration_secs: f64, energy: EnergySummary) {
        if let Some(session) = self.current_session.as_mut() {
            session.peak_power_w = session.peak_power_w.max(power_w);
            session.duration_secs = duration_secs;
            session.energy = energy;
        }
    }

    /// Close the active session and move it into history
    pub fn end_session(
        &mut self,
        reason: EndReason,
        end_voltage: f64,
        duration_secs: f64,
        energy: EnergySummary,
    ) -> Result<ChargeSession> {
        let Some(mut session) = self.current_session.take() else {
            return Err(ChargerError::generic("No active session to end"));
        };

        session.end_time = Some(Utc::now());
        session.end_voltage = Some(end_voltage);
        session.duration_secs = duration_secs;
        session.energy = energy;
        session.end_reason = Some(reason);

        self.logger.info(&format!(
            "Ended session {} ({}): {:.1}min, {:.2}V -> {:.2}V, {:.3}Ah / {:.2}Wh delivered, {:.3}Ah stored",
            session.id,
            reason,
            duration_secs / 60.0,
            session.start_voltage,
            end_voltage,
            energy.ah_delivered,
            energy.wh_delivered,
            energy.ah_stored
        ));

        self.last_session = Some(session.clone());
        if self.max_history_size > 0 {
            if self.session_history.len() == self.max_history_size {
                self.session_history.pop_front();
            }
            self.session_history.push_back(session.clone());
        }
        Ok(session)
    }

    pub const fn has_active_session(&self) -> bool {
        self.current_session.is_some()
    }

    /// Finished sessions, oldest first
    pub fn history(&self) -> impl Iterator<Item = &ChargeSession> {
        self.session_history.iter()
    }

    /// Session statistics for status displays
    pub fn get_session_stats(&self) -> serde_json::Value {
        let mut stats = serde_json::Map::new();

        if let Some(ref session) = self.current_session {
            stats.insert("session_active".to_string(), true.into());
            stats.insert("session_id".to_string(), session.id.clone().into());
            stats.insert(
                "session_duration_min".to_string(),
                (session.duration_secs / 60.0).floor().into(),
            );
            stats.insert(
                "ah_delivered".to_string(),
                session.energy.ah_delivered.into(),
            );
        } else {
            stats.insert("session_active".to_string(), false.into());
            stats.insert("session_id".to_string(), serde_json::Value::Null);
            stats.insert("session_duration_min".to_string(), serde_json::Value::Null);
            stats.insert("ah_delivered".to_string(), serde_json::Value::Null);
        }
        stats.insert(
            "completed_sessions".to_string(),
            self.session_history.len().into(),
        );

        serde_json::Value::Object(stats)
    }
}
