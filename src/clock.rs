//! Wall-clock source for the control loop
//!
//! Every deadline in the controller (absorption timeout, pulse phases,
//! conditioning duration, runaway protection, plateau window, energy
//! integration) is computed from timestamps read here, in seconds.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of "now" in seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;

    fn elapsed_since(&self, start: f64) -> f64 {
        (self.now() - start).max(0.0)
    }
}

/// Shared handle passed to the modes, the safety monitor and the driver
pub type SharedClock = Arc<dyn Clock>;

/// Seconds since the Unix epoch
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        chrono::Utc::now().timestamp_micros() as f64 / 1e6
    }
}

/// Hand-driven clock for tests and simulation; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(start.to_bits())),
        }
    }

    pub fn set(&self, secs: f64) {
        self.bits.store(secs.to_bits(), Ordering::SeqCst);
    }

    pub fn advance(&self, secs: f64) {
        let _ = self
            .bits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |bits| {
                Some((f64::from_bits(bits) + secs).to_bits())
            });
    }

    /// Boxed as a [`SharedClock`] while keeping this handle for driving it
    pub fn shared(&self) -> SharedClock {
        Arc::new(self.clone())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}
