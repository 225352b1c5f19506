use serde::{Deserialize, Serialize};

/// Cumulative energy delivered during a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergySummary {
    pub ah_delivered: f64,
    pub wh_delivered: f64,
    /// Delivered charge scaled by the charging efficiency
    pub ah_stored: f64,
    pub efficiency: f64,
}

/// Coulomb counter using left-rectangle integration between calls
#[derive(Debug, Clone)]
pub struct EnergyAccount {
    ah_delivered: f64,
    wh_delivered: f64,
    last_update: Option<f64>,
    efficiency: f64,
}

impl EnergyAccount {
    pub const fn new(efficiency: f64) -> Self {
        Self {
            ah_delivered: 0.0,
            wh_delivered: 0.0,
            last_update: None,
            efficiency,
        }
    }

    pub fn reset(&mut self) {
        self.ah_delivered = 0.0;
        self.wh_delivered = 0.0;
        self.last_update = None;
    }

    /// Add `current` and `power` held since the previous call.
    ///
    /// The first call after a reset only records the timestamp.
    pub fn integrate(&mut self, now: f64, current: f64, power: f64) {
        if let Some(last) = self.last_update {
            let dt_hours = (now - last).max(0.0) / 3600.0;
            self.ah_delivered += current * dt_hours;
            self.wh_delivered += power * dt_hours;
        }
        self.last_update = Some(now);
    }

    pub fn summary(&self) -> EnergySummary {
        EnergySummary {
            ah_delivered: self.ah_delivered,
            wh_delivered: self.wh_delivered,
            ah_stored: self.ah_delivered * self.efficiency,
            efficiency: self.efficiency,
        }
    }
}
