use super::SafetyLimits;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Outcome of one plateau check
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlateauVerdict {
    pub is_plateau: bool,
    /// Voltage is above the threshold and samples are being recorded
    pub monitoring: bool,
    /// Span of the retained samples (s)
    pub time_at_high_voltage: f64,
    /// Newest minus oldest sample over a full window, else 0 (V)
    pub voltage_rise: f64,
}

/// Time-ordered `(timestamp, voltage)` samples above the plateau threshold.
///
/// Storage is pre-allocated from the window length and tick interval but grows
/// when ticks come faster; only the timestamp cutoff removes samples.
#[derive(Debug, Clone)]
pub struct VoltageWindow {
    samples: VecDeque<(f64, f64)>,
    capacity: usize,
}

impl VoltageWindow {
    pub fn new(time_window: f64, tick_interval: f64) -> Self {
        let ticks = if tick_interval > 0.0 && time_window.is_finite() {
            (time_window / tick_interval).ceil().max(0.0) as usize
        } else {
            0
        };
        // Room for irregular tick spacing plus both window edges
        let capacity = ticks.saturating_mul(2).saturating_add(2);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Seconds between the oldest retained sample and `now`
    pub fn span(&self, now: f64) -> f64 {
        self.samples.front().map_or(0.0, |&(t, _)| now - t)
    }

    /// Record `voltage` at `now` and evaluate the window.
    ///
    /// Readings below the threshold are not recorded; samples already in the
    /// window stay until they age out.
    pub fn observe(&mut self, limits: &SafetyLimits, now: f64, voltage: f64) -> PlateauVerdict {
        if !limits.plateau_enabled || voltage < limits.plateau_threshold_voltage {
            return PlateauVerdict::default();
        }

        self.samples.push_back((now, voltage));

        let cutoff = now - limits.plateau_time_window;
        while self.samples.front().is_some_and(|&(t, _)| t < cutoff) {
            self.samples.pop_front();
        }

        let span = self.span(now);
        if self.samples.len() < 2 || span < limits.plateau_time_window {
            return PlateauVerdict {
                is_plateau: false,
                monitoring: true,
                time_at_high_voltage: span,
                voltage_rise: 0.0,
            };
        }

        let oldest = self.samples.front().map_or(voltage, |&(_, v)| v);
        let newest = self.samples.back().map_or(voltage, |&(_, v)| v);
        let voltage_rise = newest - oldest;
        PlateauVerdict {
            is_plateau: voltage_rise.abs() <= limits.plateau_voltage_delta,
            monitoring: true,
            time_at_high_voltage: span,
            voltage_rise,
        }
    }
}
