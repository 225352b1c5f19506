//! Control loop for the charger
//!
//! [`ChargerDriver`] is the single owner of the active mode, the safety
//! monitor and the power supply. Other tasks talk to it through a command
//! channel that is drained at the start of each tick and observe it through
//! the status channels; no core state sits behind a lock.

use crate::clock::SharedClock;
use crate::config::Config;
use crate::error::Result;
use crate::logging::{StructuredLogger, get_logger};
use crate::modes::{ChargingMode, Lifecycle};
use crate::psu::{PowerSupply, TemperatureSensor};
use crate::safety::SafetyMonitor;
use crate::session::{ChargeSessionManager, EndReason};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{Duration, MissedTickBehavior, interval};

mod commands;
mod recovery;
mod types;

pub use recovery::ConnectionMonitor;
pub use types::{ChargerSnapshot, DriverCommand, DriverState};

/// Sessions kept in memory for status queries
const SESSION_HISTORY: usize = 20;

/// Main driver for the charger
pub struct ChargerDriver {
    config: Config,

    psu: Box<dyn PowerSupply>,

    temperature: Option<Box<dyn TemperatureSensor>>,

    clock: SharedClock,

    /// Selected mode, kept after a session ends so it can be restarted
    mode: Option<ChargingMode>,

    monitor: SafetyMonitor,

    sessions: ChargeSessionManager,

    recovery: ConnectionMonitor,

    /// Current driver state
    state: watch::Sender<DriverState>,

    /// Logger with context
    logger: StructuredLogger,

    commands_rx: mpsc::UnboundedReceiver<DriverCommand>,
    commands_tx: mpsc::UnboundedSender<DriverCommand>,

    shutdown_tx: mpsc::UnboundedSender<()>,
    shutdown_rx: mpsc::UnboundedReceiver<()>,

    /// JSON snapshots for streaming consumers
    status_tx: broadcast::Sender<String>,

    /// Latest typed snapshot
    snapshot_tx: watch::Sender<Arc<ChargerSnapshot>>,

    last_summary_log: f64,
    last_end_reason: Option<EndReason>,
    total_ticks: u64,
}

impl ChargerDriver {
    /// Build a driver around `psu`. The configuration is validated first.
    pub fn new(config: Config, psu: Box<dyn PowerSupply>, clock: SharedClock) -> Result<Self> {
        config.validate()?;

        let logger = get_logger("driver");
        logger.info("Initializing charger driver");

        let monitor = SafetyMonitor::with_tick_interval(
            config.safety.limits(),
            clock.clone(),
            config.safety.measurement_interval,
        );
        let recovery = ConnectionMonitor::new(&config.recovery);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(DriverState::Initializing);
        let (status_tx, _status_rx) = broadcast::channel::<String>(100);
        let (snapshot_tx, _) = watch::channel(Arc::new(ChargerSnapshot::default()));

        Ok(Self {
            config,
            psu,
            temperature: None,
            clock,
            mode: None,
            monitor,
            sessions: ChargeSessionManager::new(SESSION_HISTORY),
            recovery,
            state: state_tx,
            logger,
            commands_rx,
            commands_tx,
            shutdown_tx,
            shutdown_rx,
            status_tx,
            snapshot_tx,
            last_summary_log: 0.0,
            last_end_reason: None,
            total_ticks: 0,
        })
    }

    /// Attach a battery temperature probe
    #[must_use]
    pub fn with_temperature_sensor(mut self, sensor: Box<dyn TemperatureSensor>) -> Self {
        self.temperature = Some(sensor);
        self
    }

    /// Run the control loop until a shutdown is requested
    pub async fn run(&mut self) -> Result<()> {
        self.logger.info("Starting charger main loop");
        self.state.send_replace(DriverState::Running);

        let period = Duration::from_secs_f64(self.config.safety.measurement_interval);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick();
                }
                _ = self.shutdown_rx.recv() => {
                    self.logger.info("Shutdown signal received");
                    break;
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    /// One control cycle: apply queued commands, supervise the link, advance
    /// the active session and publish a snapshot.
    pub fn tick(&mut self) -> Arc<ChargerSnapshot> {
        self.last_end_reason = None;
        while let Ok(cmd) = self.commands_rx.try_recv() {
            self.handle_command(cmd);
        }

        let now = self.clock.now();
        self.recovery.poll(self.psu.as_mut(), now);
        self.total_ticks = self.total_ticks.saturating_add(1);

        let mut snapshot = ChargerSnapshot::default();
        if self.is_charging() {
            self.charging_cycle(&mut snapshot);
        } else {
            snapshot.mode = self.mode.as_ref().map(ChargingMode::status);
            snapshot.energy = self.monitor.energy();
        }

        snapshot.timestamp = chrono::Utc::now().to_rfc3339();
        snapshot.driver_state = self.get_state().to_string();
        snapshot.session_id = self.sessions.current_session.as_ref().map(|s| s.id.clone());
        snapshot.session_end = self.last_end_reason;
        snapshot.psu_connected = self.psu.is_connected();
        snapshot.total_ticks = self.total_ticks;

        let snapshot = Arc::new(snapshot);
        self.publish(&snapshot);
        snapshot
    }

    fn charging_cycle(&mut self, snapshot: &mut ChargerSnapshot) {
        let Some(mode) = self.mode.as_mut() else {
            return;
        };
        let status = mode.update(self.psu.as_mut());
        snapshot.mode = Some(status.clone());

        if status.state == Lifecycle::Error {
            self.logger
                .error("Charging mode reported a hardware error, ending session");
            self.state
                .send_replace(DriverState::Error("power supply communication failed".to_string()));
            snapshot.energy = self.monitor.energy();
            self.stop_charging(EndReason::HardwareError);
            return;
        }

        let temperature = self.temperature.as_mut().and_then(|s| s.read_celsius());
        let verdict = self
            .monitor
            .check_safety(status.voltage, status.current, temperature);
        let energy = self
            .monitor
            .update_energy_accounting(status.current, status.power);
        let progress = self.monitor.progress_for(&status);
        self.sessions.update(status.power, status.elapsed, energy);

        snapshot.temperature = temperature;
        snapshot.energy = energy;
        snapshot.progress = progress;

        let now = self.clock.now();
        if now - self.last_summary_log >= self.config.safety.log_interval {
            self.last_summary_log = now;
            self.log_summary(&status, progress, energy.ah_delivered);
        }

        if verdict.should_stop {
            self.logger.error(&format!(
                "Safety limit exceeded: {}",
                verdict.violations.join("; ")
            ));
            snapshot.safety = Some(verdict);
            self.stop_charging(EndReason::SafetyViolation);
            return;
        }
        snapshot.safety = Some(verdict);

        let plateau = self.monitor.check_voltage_plateau(status.voltage);
        snapshot.plateau = Some(plateau);
        if plateau.is_plateau {
            self.logger.info("Voltage plateau reached, charge complete");
            self.stop_charging(EndReason::Plateau);
            return;
        }

        if self.monitor.is_charging_complete(
            status.mode,
            status.current,
            status.state,
            status.min_current().unwrap_or(self.config.charging.cv.min_current),
        ) {
            self.logger.info("Charging complete");
            self.stop_charging(EndReason::Completed);
        }
    }

    fn log_summary(&self, status: &crate::modes::ModeStatus, progress: f64, ah: f64) {
        let stage = status
            .stage()
            .map(|s| format!(" {}", s))
            .unwrap_or_default();
        self.logger.info(&format!(
            "{}{}: {:.2}V {:.2}A {:.1}W, {:.0}% ({:.3}Ah) after {:.1}min",
            status.mode,
            stage,
            status.voltage,
            status.current,
            status.power,
            progress,
            ah,
            status.elapsed / 60.0
        ));
    }

    fn publish(&self, snapshot: &Arc<ChargerSnapshot>) {
        match serde_json::to_string(snapshot.as_ref()) {
            // No subscribers is not an error
            Ok(json) => {
                let _ = self.status_tx.send(json);
            }
            Err(e) => self
                .logger
                .warn(&format!("Failed to serialize status snapshot: {}", e)),
        }
        self.snapshot_tx.send_replace(Arc::clone(snapshot));
    }

    /// End any session, force the output off and mark the driver stopping
    pub fn shutdown(&mut self) {
        self.state.send_replace(DriverState::ShuttingDown);
        self.logger.info("Shutting down driver");
        self.stop_charging(EndReason::Shutdown);
        self.logger.info("Driver shutdown complete");
    }

    pub fn is_charging(&self) -> bool {
        self.mode.as_ref().is_some_and(ChargingMode::is_charging)
    }

    /// Get current driver state
    pub fn get_state(&self) -> DriverState {
        self.state.borrow().clone()
    }

    /// Request shutdown of a running loop
    pub fn request_shutdown(&self) {
        self.shutdown_tx.send(()).ok();
    }

    /// Sender that stops a running loop from another task
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<()> {
        self.shutdown_tx.clone()
    }

    /// Queue commands from any task; they take effect at the next tick
    pub fn command_sender(&self) -> mpsc::UnboundedSender<DriverCommand> {
        self.commands_tx.clone()
    }

    /// Get configuration reference
    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub const fn mode(&self) -> Option<&ChargingMode> {
        self.mode.as_ref()
    }

    pub const fn monitor(&self) -> &SafetyMonitor {
        &self.monitor
    }

    pub const fn sessions(&self) -> &ChargeSessionManager {
        &self.sessions
    }

    pub const fn recovery(&self) -> &ConnectionMonitor {
        &self.recovery
    }

    /// Subscribe to JSON status updates
    pub fn subscribe_status(&self) -> broadcast::Receiver<String> {
        self.status_tx.subscribe()
    }

    /// Watch the latest snapshot
    pub fn watch_snapshot(&self) -> watch::Receiver<Arc<ChargerSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    pub fn watch_state(&self) -> watch::Receiver<DriverState> {
        self.state.subscribe()
    }
}
