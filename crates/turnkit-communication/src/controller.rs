//! Turntable operations
//!
//! `TurntableController` composes command-channel exchanges into the named
//! turntable actions (enable, home, rotate, emergency stop, queries) and
//! owns every piece of mutable state around them: the channel itself, the
//! tracked position, the motor state, the monitor slot, and the auto-disable
//! slot. Front-ends hold a controller and never touch the transport.
//!
//! The tracked position is a commanded-position ledger, not a measurement:
//! the firmware never reports its angle spontaneously, so the controller
//! records the last angle it asked for and trusts the firmware to get there.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use turnkit_core::{
    CommandError, Direction, Error, MotorState, Result, SendOutcome, TransportError,
    DEGREES_PER_TURN,
};

use crate::channel::CommandChannel;
use crate::monitor::{LineCallback, MonitorLine, MonitorSession};
use crate::transport::SerialTransport;

/// Pause between the commands of a composite operation. The firmware wants
/// a beat between mode changes and the moves that follow them.
pub const INTER_COMMAND_DELAY: Duration = Duration::from_millis(100);

/// Pause after opening the port. The firmware resets on port-open (DTR
/// toggle) and needs initialization time before it will accept commands.
pub const POST_OPEN_SETTLE: Duration = Duration::from_millis(2000);

/// Controller for one MakerBot Digitizer turntable (Horus 0.2 firmware).
pub struct TurntableController {
    /// Channel mutex doubles as the transport read-path lock: a foreground
    /// exchange holds it for the whole collection window, the monitor takes
    /// it per poll.
    channel: Arc<Mutex<CommandChannel>>,
    /// Last commanded absolute angle, degrees. Optimistic.
    position: Arc<RwLock<f64>>,
    /// Last commanded motor state. Optimistic.
    motor_state: Arc<RwLock<MotorState>>,
    /// Configured auto-disable timeout, if any.
    auto_disable: Arc<RwLock<Option<Duration>>>,
    /// Pending auto-disable one-shot. Single slot: scheduling cancels the
    /// previous task first.
    auto_disable_task: Arc<RwLock<Option<JoinHandle<()>>>>,
    /// Active monitor, if any.
    monitor: Arc<RwLock<Option<MonitorSession>>>,
}

impl TurntableController {
    /// New controller with no connection.
    pub fn new() -> Self {
        Self::with_channel(CommandChannel::new())
    }

    /// New controller over an existing channel (tests use this with a mock
    /// transport).
    pub fn with_channel(channel: CommandChannel) -> Self {
        Self {
            channel: Arc::new(Mutex::new(channel)),
            position: Arc::new(RwLock::new(0.0)),
            motor_state: Arc::new(RwLock::new(MotorState::Disconnected)),
            auto_disable: Arc::new(RwLock::new(None)),
            auto_disable_task: Arc::new(RwLock::new(None)),
            monitor: Arc::new(RwLock::new(None)),
        }
    }

    // --- connection lifecycle ---

    /// Open the serial port and wait out the firmware's reset.
    pub async fn connect(&self, port: &str, baud_rate: u32) -> Result<()> {
        if self.is_connected().await {
            self.disconnect().await;
        }

        let transport = SerialTransport::open(port, baud_rate)?;
        self.channel.lock().await.attach(Box::new(transport));

        tokio::time::sleep(POST_OPEN_SETTLE).await;
        *self.motor_state.write() = MotorState::Disabled;
        tracing::info!(port, baud = baud_rate, "turntable connected");
        Ok(())
    }

    /// Tear everything down: pending auto-disable first, then the monitor,
    /// then the connection, so nothing operates on a closed port. Idempotent.
    pub async fn disconnect(&self) {
        self.cancel_auto_disable();
        self.stop_monitor();
        let mut channel = self.channel.lock().await;
        if channel.is_connected() {
            channel.close();
            tracing::info!("turntable disconnected");
        }
        *self.motor_state.write() = MotorState::Disconnected;
    }

    /// Whether a connection is open.
    pub async fn is_connected(&self) -> bool {
        self.channel.lock().await.is_connected()
    }

    // --- primitive exchange ---

    /// Send a raw G-code/GRBL command and collect its reply.
    pub async fn send_raw(&self, command: &str) -> Result<SendOutcome> {
        self.channel.lock().await.send(command).await
    }

    /// Drop any buffered-but-unread device output.
    pub async fn flush_input(&self) -> Result<()> {
        self.channel.lock().await.discard_input()
    }

    // --- motor control ---

    /// Enable the motor (`M17`). Schedules the auto-disable one-shot when a
    /// timeout is configured.
    pub async fn enable_motor(&self) -> Result<SendOutcome> {
        tracing::info!("enabling motor");
        let outcome = self.send_raw("M17").await?;
        *self.motor_state.write() = MotorState::Enabled;

        let timeout = *self.auto_disable.read();
        if let Some(timeout) = timeout {
            tracing::info!(seconds = timeout.as_secs_f64(), "auto-disable armed");
            self.schedule_auto_disable(timeout);
        }
        Ok(outcome)
    }

    /// Disable the motor (`M18`), cancelling any pending auto-disable.
    /// Safety-critical: reachable regardless of prior state.
    pub async fn disable_motor(&self) -> Result<SendOutcome> {
        self.cancel_auto_disable();
        tracing::info!("disabling motor");
        let outcome = self.send_raw("M18").await?;
        *self.motor_state.write() = MotorState::Disabled;
        Ok(outcome)
    }

    /// Zero the firmware position register (`G50`) and the tracked position.
    pub async fn reset_position(&self) -> Result<SendOutcome> {
        tracing::info!("resetting position to zero");
        let outcome = self.send_raw("G50").await?;
        *self.position.write() = 0.0;
        Ok(outcome)
    }

    /// Home: enable the motor, then zero the position.
    pub async fn home(&self) -> Result<SendOutcome> {
        tracing::info!("homing turntable");
        self.enable_motor().await?;
        tokio::time::sleep(INTER_COMMAND_DELAY).await;
        self.reset_position().await
    }

    // --- motion ---

    /// Set the feed rate in degrees per second (`G1 F`). No bounds checking;
    /// the firmware enforces its own limits.
    pub async fn set_speed(&self, speed_dps: f64) -> Result<SendOutcome> {
        tracing::info!(speed = speed_dps, "setting speed");
        self.send_raw(&format!("G1 F{}", gcode_num(speed_dps))).await
    }

    /// Move to an absolute angle in degrees (`G1 X`), which may be negative.
    ///
    /// The tracked position becomes `position_deg` whenever the command was
    /// actually put on the wire, acknowledged or not.
    pub async fn rotate_to_absolute(&self, position_deg: f64) -> Result<SendOutcome> {
        tracing::info!(target = position_deg, "rotating to absolute position");
        let result = self
            .send_raw(&format!("G1 X{}", gcode_num(position_deg)))
            .await;
        if !matches!(&result, Err(Error::Transport(TransportError::NotConnected))) {
            *self.position.write() = position_deg;
        }
        result
    }

    /// Set the speed, then move to an absolute angle.
    pub async fn rotate_to(&self, position_deg: f64, speed_dps: f64) -> Result<SendOutcome> {
        self.set_speed(speed_dps).await?;
        tokio::time::sleep(INTER_COMMAND_DELAY).await;
        self.rotate_to_absolute(position_deg).await
    }

    /// Rotate a number of full turns in `direction` from the tracked
    /// position. Zero turns is rejected before anything is sent.
    pub async fn rotate_relative(
        &self,
        turns: f64,
        speed_dps: f64,
        direction: Direction,
    ) -> Result<SendOutcome> {
        if turns == 0.0 {
            return Err(CommandError::ZeroTurns.into());
        }

        let current = *self.position.read();
        let target = current + direction.sign() * turns * DEGREES_PER_TURN;
        tracing::info!(turns, %direction, from = current, to = target, "rotating");
        self.rotate_to(target, speed_dps).await
    }

    /// Feed hold, then disable the motor. Both steps are always attempted;
    /// the first error is surfaced after both ran.
    pub async fn emergency_stop(&self) -> Result<SendOutcome> {
        tracing::warn!("emergency stop");
        let hold = self.send_raw("!").await;
        if let Err(ref e) = hold {
            tracing::error!(error = %e, "feed hold failed, still disabling motor");
        }
        tokio::time::sleep(INTER_COMMAND_DELAY).await;
        let disabled = self.disable_motor().await;
        hold.and(disabled)
    }

    // --- queries and system control ---

    /// Real-time status query (`?`).
    pub async fn get_status(&self) -> Result<SendOutcome> {
        self.send_raw("?").await
    }

    /// Settings dump (`$$`). Many lines; the collection window handles it.
    pub async fn get_settings(&self) -> Result<SendOutcome> {
        self.send_raw("$$").await
    }

    /// G-code parser state (`$G`).
    pub async fn get_parser_state(&self) -> Result<SendOutcome> {
        self.send_raw("$G").await
    }

    /// Firmware build info (`$I`).
    pub async fn get_build_info(&self) -> Result<SendOutcome> {
        self.send_raw("$I").await
    }

    /// Clear an alarm state (`$X`).
    pub async fn unlock_alarm(&self) -> Result<SendOutcome> {
        tracing::info!("unlocking alarm");
        self.send_raw("$X").await
    }

    /// Firmware soft reset, a raw `0x18` control byte.
    pub async fn soft_reset(&self) -> Result<SendOutcome> {
        tracing::info!("soft reset");
        let outcome = self.send_raw("\x18").await?;
        *self.motor_state.write() = MotorState::Disabled;
        Ok(outcome)
    }

    /// Resume a held cycle (`~`).
    pub async fn cycle_start(&self) -> Result<SendOutcome> {
        self.send_raw("~").await
    }

    /// Pause motion immediately (`!`).
    pub async fn feed_hold(&self) -> Result<SendOutcome> {
        self.send_raw("!").await
    }

    // --- tracked state ---

    /// Last commanded absolute angle, degrees.
    pub fn position(&self) -> f64 {
        *self.position.read()
    }

    /// Overwrite the position ledger without sending anything, for when the
    /// platter was moved by other means.
    pub fn sync_position(&self, position_deg: f64) {
        tracing::info!(position = position_deg, "position ledger synced");
        *self.position.write() = position_deg;
    }

    /// Last commanded motor state.
    pub fn motor_state(&self) -> MotorState {
        *self.motor_state.read()
    }

    // --- auto-disable ---

    /// Configure the auto-disable timeout applied by [`enable_motor`].
    /// `None` turns the feature off. Does not affect an already-pending
    /// one-shot.
    ///
    /// [`enable_motor`]: TurntableController::enable_motor
    pub fn set_auto_disable(&self, timeout: Option<Duration>) {
        *self.auto_disable.write() = timeout;
    }

    /// Configured auto-disable timeout.
    pub fn auto_disable(&self) -> Option<Duration> {
        *self.auto_disable.read()
    }

    /// Whether an auto-disable one-shot is pending.
    pub fn auto_disable_pending(&self) -> bool {
        self.auto_disable_task
            .read()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    fn schedule_auto_disable(&self, timeout: Duration) {
        self.cancel_auto_disable();

        let channel = self.channel.clone();
        let motor_state = self.motor_state.clone();
        let slot = self.auto_disable_task.clone();

        let task = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            tracing::info!("auto-disable timeout reached, disabling motor");
            let result = channel.lock().await.send("M18").await;
            match result {
                Ok(_) => *motor_state.write() = MotorState::Disabled,
                Err(e) => tracing::warn!(error = %e, "auto-disable failed"),
            }
            *slot.write() = None;
        });

        *self.auto_disable_task.write() = Some(task);
    }

    fn cancel_auto_disable(&self) {
        if let Some(task) = self.auto_disable_task.write().take() {
            task.abort();
        }
    }

    // --- continuous monitor ---

    /// Start passive monitoring, replacing any active session. Bounded when
    /// `duration` is set, otherwise runs until [`stop_monitor`].
    ///
    /// [`stop_monitor`]: TurntableController::stop_monitor
    pub fn start_monitor<F>(&self, duration: Option<Duration>, on_line: F)
    where
        F: Fn(MonitorLine) + Send + Sync + 'static,
    {
        self.stop_monitor();
        let callback: LineCallback = Arc::new(on_line);
        let session = MonitorSession::spawn(self.channel.clone(), duration, callback);
        *self.monitor.write() = Some(session);
    }

    /// Stop the monitor if one is active.
    pub fn stop_monitor(&self) {
        if let Some(session) = self.monitor.write().take() {
            session.stop();
        }
    }

    /// Whether a monitor task is running.
    pub fn monitor_active(&self) -> bool {
        self.monitor
            .read()
            .as_ref()
            .is_some_and(|session| session.is_active())
    }

    /// Wait for a bounded monitor session to run out.
    pub async fn wait_monitor(&self) {
        let session = self.monitor.write().take();
        if let Some(session) = session {
            session.wait().await;
        }
    }
}

impl Default for TurntableController {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a numeric G-code field. Integral values keep a trailing `.0`
/// (`730.0`, not `730`), the decimal form the firmware's float fields have
/// always been fed.
fn gcode_num(value: f64) -> String {
    format!("{:?}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gcode_num_keeps_decimal_point() {
        assert_eq!(gcode_num(730.0), "730.0");
        assert_eq!(gcode_num(-90.0), "-90.0");
        assert_eq!(gcode_num(90.5), "90.5");
        assert_eq!(gcode_num(0.0), "0.0");
    }

    #[tokio::test]
    async fn fresh_controller_is_disconnected() {
        let controller = TurntableController::new();
        assert!(!controller.is_connected().await);
        assert_eq!(controller.motor_state(), MotorState::Disconnected);
        assert_eq!(controller.position(), 0.0);
        assert!(!controller.auto_disable_pending());
        assert!(!controller.monitor_active());
    }

    #[tokio::test]
    async fn sync_position_touches_only_the_ledger() {
        let controller = TurntableController::new();
        controller.sync_position(42.5);
        assert_eq!(controller.position(), 42.5);
        // Still disconnected: nothing was sent anywhere.
        assert!(!controller.is_connected().await);
    }
}
