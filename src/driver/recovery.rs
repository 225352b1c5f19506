use crate::config::RecoveryConfig;
use crate::logging::{StructuredLogger, get_logger};
use crate::psu::PowerSupply;

/// Periodic power supply link check with reconnect
pub struct ConnectionMonitor {
    enabled: bool,
    check_interval: f64,
    last_check: Option<f64>,
    disconnects: u64,
    reconnects: u64,
    logger: StructuredLogger,
}

impl ConnectionMonitor {
    pub fn new(config: &RecoveryConfig) -> Self {
        Self {
            enabled: config.enabled,
            check_interval: config.check_interval,
            last_check: None,
            disconnects: 0,
            reconnects: 0,
            logger: get_logger("psu"),
        }
    }

    /// Check the link if `check_interval` has passed since the last check.
    ///
    /// Returns `None` when no check was due, otherwise whether the supply is
    /// connected after any reconnect attempt.
    pub fn poll(&mut self, psu: &mut dyn PowerSupply, now: f64) -> Option<bool> {
        if let Some(last) = self.last_check
            && now - last < self.check_interval
        {
            return None;
        }
        self.last_check = Some(now);

        if psu.is_connected() {
            return Some(true);
        }

        self.disconnects = self.disconnects.saturating_add(1);
        self.logger.warn(&format!(
            "Power supply disconnected ({} so far)",
            self.disconnects
        ));
        if !self.enabled {
            return Some(false);
        }

        match psu.reconnect() {
            Ok(()) => {
                self.reconnects = self.reconnects.saturating_add(1);
                self.logger.info("Power supply reconnected");
                Some(true)
            }
            Err(e) => {
                self.logger.error(&format!("Reconnect failed: {}", e));
                Some(false)
            }
        }
    }

    pub const fn disconnect_count(&self) -> u64 {
        self.disconnects
    }

    pub const fn reconnect_count(&self) -> u64 {
        self.reconnects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psu::MockSupply;

    fn config(enabled: bool) -> RecoveryConfig {
        RecoveryConfig {
            enabled,
            check_interval: 10.0,
        }
    }

    #[test]
    fn checks_only_every_interval() {
        let mut monitor = ConnectionMonitor::new(&config(true));
        let mut psu = MockSupply::new();
        assert_eq!(monitor.poll(&mut psu, 0.0), Some(true));
        assert_eq!(monitor.poll(&mut psu, 5.0), None);
        assert_eq!(monitor.poll(&mut psu, 10.0), Some(true));
    }

    #[test]
    fn reconnects_dropped_supply() {
        let mut monitor = ConnectionMonitor::new(&config(true));
        let mut psu = MockSupply::new();
        psu.set_connected(false);
        assert_eq!(monitor.poll(&mut psu, 0.0), Some(true));
        assert!(psu.is_connected());
        assert_eq!(psu.reconnect_attempts(), 1);
        assert_eq!(monitor.disconnect_count(), 1);
        assert_eq!(monitor.reconnect_count(), 1);
    }

    #[test]
    fn failed_reconnect_is_reported() {
        let mut monitor = ConnectionMonitor::new(&config(true));
        let mut psu = MockSupply::new();
        psu.set_connected(false);
        psu.fail_writes(true);
        assert_eq!(monitor.poll(&mut psu, 0.0), Some(false));
        assert_eq!(monitor.reconnect_count(), 0);
    }

    #[test]
    fn disabled_recovery_only_counts() {
        let mut monitor = ConnectionMonitor::new(&config(false));
        let mut psu = MockSupply::new();
        psu.set_connected(false);
        assert_eq!(monitor.poll(&mut psu, 0.0), Some(false));
        assert_eq!(psu.reconnect_attempts(), 0);
        assert_eq!(monitor.disconnect_count(), 1);
    }
}
