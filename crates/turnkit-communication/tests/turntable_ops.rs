//! Turntable operation tests against a scripted mock transport.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use turnkit_communication::channel::CommandChannel;
use turnkit_communication::controller::TurntableController;
use turnkit_communication::transport::Transport;
use turnkit_core::{Direction, Error, MotorState, SendOutcome, TransportError};

/// Shared handles into a [`MockTransport`], kept by the test after the
/// transport is boxed away into the controller.
#[derive(Clone, Default)]
struct MockState {
    /// Every write attempt, lossily decoded, in order.
    written: Arc<Mutex<Vec<String>>>,
    /// Bytes buffered as if arrived from the device.
    incoming: Arc<Mutex<VecDeque<u8>>>,
    /// Canned device replies, one consumed per successful write.
    replies: Arc<Mutex<VecDeque<Vec<u8>>>>,
    /// Writes whose payload equals this fail with a transport error
    /// (after being recorded as attempted).
    fail_write_on: Arc<Mutex<Option<Vec<u8>>>>,
}

impl MockState {
    fn written(&self) -> Vec<String> {
        self.written.lock().unwrap().clone()
    }

    fn push_incoming(&self, bytes: &[u8]) {
        self.incoming.lock().unwrap().extend(bytes.iter().copied());
    }

    fn queue_reply(&self, bytes: &[u8]) {
        self.replies.lock().unwrap().push_back(bytes.to_vec());
    }

    fn inject_write_fault(&self, payload: &[u8]) {
        *self.fail_write_on.lock().unwrap() = Some(payload.to_vec());
    }

    fn count_writes(&self, payload: &str) -> usize {
        self.written
            .lock()
            .unwrap()
            .iter()
            .filter(|w| w.as_str() == payload)
            .count()
    }
}

struct MockTransport {
    state: MockState,
    open: bool,
}

impl MockTransport {
    fn new(state: MockState) -> Self {
        Self { state, open: true }
    }
}

impl Transport for MockTransport {
    fn write(&mut self, bytes: &[u8]) -> turnkit_core::Result<()> {
        if !self.open {
            return Err(TransportError::NotConnected.into());
        }
        self.state
            .written
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(bytes).to_string());

        if self.state.fail_write_on.lock().unwrap().as_deref() == Some(bytes) {
            return Err(TransportError::Write {
                reason: "injected fault".to_string(),
            }
            .into());
        }

        if let Some(reply) = self.state.replies.lock().unwrap().pop_front() {
            self.state.push_incoming(&reply);
        }
        Ok(())
    }

    fn bytes_available(&mut self) -> turnkit_core::Result<usize> {
        if !self.open {
            return Err(TransportError::NotConnected.into());
        }
        Ok(self.state.incoming.lock().unwrap().len())
    }

    fn read_line(&mut self) -> turnkit_core::Result<String> {
        if !self.open {
            return Err(TransportError::NotConnected.into());
        }
        let mut buf = Vec::new();
        let mut incoming = self.state.incoming.lock().unwrap();
        while let Some(byte) = incoming.pop_front() {
            if byte == b'\n' {
                break;
            }
            buf.push(byte);
        }
        String::from_utf8(buf).map_err(|e| {
            TransportError::Decode {
                reason: e.to_string(),
            }
            .into()
        })
    }

    fn discard_input(&mut self) -> turnkit_core::Result<()> {
        self.state.incoming.lock().unwrap().clear();
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }
}

fn mock_controller() -> (TurntableController, MockState) {
    let state = MockState::default();
    let channel = CommandChannel::with_transport(Box::new(MockTransport::new(state.clone())));
    (TurntableController::with_channel(channel), state)
}

#[tokio::test]
async fn home_sends_enable_then_zero() {
    let (controller, state) = mock_controller();
    controller.sync_position(55.0);

    controller.home().await.unwrap();

    assert_eq!(state.written(), ["M17\n", "G50\n"]);
    assert_eq!(controller.position(), 0.0);
    assert_eq!(controller.motor_state(), MotorState::Enabled);
}

#[tokio::test]
async fn reset_zeroes_tracked_position() {
    let (controller, state) = mock_controller();
    controller.sync_position(-123.4);

    controller.reset_position().await.unwrap();

    assert_eq!(state.written(), ["G50\n"]);
    assert_eq!(controller.position(), 0.0);
}

#[tokio::test]
async fn rotate_to_absolute_sets_exact_position() {
    let (controller, state) = mock_controller();

    controller.rotate_to_absolute(90.5).await.unwrap();

    assert_eq!(state.written(), ["G1 X90.5\n"]);
    assert_eq!(controller.position(), 90.5);
}

#[tokio::test]
async fn rotate_relative_commands_and_math() {
    let (controller, state) = mock_controller();
    controller.sync_position(10.0);

    controller
        .rotate_relative(2.0, 250.0, Direction::CounterClockwise)
        .await
        .unwrap();

    assert_eq!(state.written(), ["G1 F250.0\n", "G1 X730.0\n"]);
    assert_eq!(controller.position(), 730.0);
}

#[tokio::test]
async fn rotate_relative_clockwise_goes_negative() {
    let (controller, state) = mock_controller();

    controller
        .rotate_relative(1.0, 200.0, Direction::Clockwise)
        .await
        .unwrap();

    assert_eq!(state.written(), ["G1 F200.0\n", "G1 X-360.0\n"]);
    assert_eq!(controller.position(), -360.0);
}

#[tokio::test]
async fn rotate_relative_zero_turns_rejected_before_sending() {
    let (controller, state) = mock_controller();

    let err = controller
        .rotate_relative(0.0, 200.0, Direction::CounterClockwise)
        .await
        .unwrap_err();

    assert!(err.is_command_error());
    assert!(state.written().is_empty());
    assert_eq!(controller.position(), 0.0);
}

#[tokio::test]
async fn emergency_stop_attempts_both_steps_on_failure() {
    let (controller, state) = mock_controller();
    state.inject_write_fault(b"!");

    let result = controller.emergency_stop().await;

    assert!(result.is_err());
    assert_eq!(state.written(), ["!", "M18\n"]);
    assert_eq!(controller.motor_state(), MotorState::Disabled);
}

#[tokio::test]
async fn silent_device_yields_accepted() {
    let (controller, _state) = mock_controller();

    let outcome = controller.send_raw("M17").await.unwrap();

    assert_eq!(outcome, SendOutcome::Accepted);
    assert!(outcome.is_silent());
}

#[tokio::test]
async fn response_lines_collected_in_order() {
    let (controller, state) = mock_controller();
    state.queue_reply(b"$0=230\r\n$1=25\r\nok\r\n");

    let outcome = controller.get_settings().await.unwrap();

    assert_eq!(
        outcome.lines(),
        ["$0=230".to_string(), "$1=25".to_string(), "ok".to_string()]
    );
}

#[tokio::test]
async fn undecodable_line_skipped_not_fatal() {
    let (controller, state) = mock_controller();
    state.queue_reply(b"\xff\xfe garbage\nok\n");

    let outcome = controller.get_status().await.unwrap();

    assert_eq!(outcome.lines(), ["ok".to_string()]);
}

#[tokio::test]
async fn not_connected_fails_without_side_effects() {
    let controller = TurntableController::with_channel(CommandChannel::new());
    controller.sync_position(10.0);

    let err = controller.rotate_to_absolute(99.0).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Transport(TransportError::NotConnected)
    ));
    // Nothing was attempted, so the ledger is untouched.
    assert_eq!(controller.position(), 10.0);
}

#[tokio::test]
async fn composite_aborts_on_first_failure() {
    let (controller, state) = mock_controller();
    state.inject_write_fault(b"G1 F100.0\n");

    let result = controller.rotate_to(45.0, 100.0).await;

    assert!(result.is_err());
    // The move was never attempted after the speed command failed.
    assert_eq!(state.written(), ["G1 F100.0\n"]);
    assert_eq!(controller.position(), 0.0);
}

#[tokio::test]
async fn auto_disable_fires_once() {
    let (controller, state) = mock_controller();
    controller.set_auto_disable(Some(Duration::from_millis(30)));

    controller.enable_motor().await.unwrap();
    assert!(controller.auto_disable_pending());

    // The one-shot itself runs a full exchange; allow for its window.
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(state.count_writes("M18\n"), 1);
    assert!(!controller.auto_disable_pending());
    assert_eq!(controller.motor_state(), MotorState::Disabled);
}

#[tokio::test]
async fn rescheduling_auto_disable_cancels_the_previous_one() {
    let (controller, state) = mock_controller();
    controller.set_auto_disable(Some(Duration::from_millis(400)));

    controller.enable_motor().await.unwrap();
    controller.enable_motor().await.unwrap();

    // Had both one-shots survived, two disables would land by now.
    tokio::time::sleep(Duration::from_millis(900)).await;

    assert_eq!(state.count_writes("M17\n"), 2);
    assert_eq!(state.count_writes("M18\n"), 1);
    assert!(!controller.auto_disable_pending());
}

#[tokio::test]
async fn manual_disable_cancels_pending_auto_disable() {
    let (controller, state) = mock_controller();
    controller.set_auto_disable(Some(Duration::from_secs(30)));

    controller.enable_motor().await.unwrap();
    assert!(controller.auto_disable_pending());

    controller.disable_motor().await.unwrap();

    assert!(!controller.auto_disable_pending());
    assert_eq!(state.count_writes("M18\n"), 1);
}

#[tokio::test]
async fn monitor_emits_buffered_lines_until_stopped() {
    let (controller, state) = mock_controller();

    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    controller.start_monitor(None, move |line| {
        sink.lock().unwrap().push(line.text);
    });

    state.push_incoming(b"<Idle|MPos:0.000>\nok\n");
    tokio::time::sleep(Duration::from_millis(100)).await;

    controller.stop_monitor();
    assert!(!controller.monitor_active());

    let lines = seen.lock().unwrap().clone();
    assert_eq!(lines, ["<Idle|MPos:0.000>".to_string(), "ok".to_string()]);

    // Output arriving after the stop is not observed.
    state.push_incoming(b"late\n");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn bounded_monitor_stops_at_deadline() {
    let (controller, _state) = mock_controller();

    controller.start_monitor(Some(Duration::from_millis(50)), |_line| {});
    assert!(controller.monitor_active());

    controller.wait_monitor().await;
    assert!(!controller.monitor_active());
}

#[tokio::test]
async fn starting_a_monitor_replaces_the_previous_session() {
    let (controller, state) = mock_controller();

    let first: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = first.clone();
    controller.start_monitor(None, move |line| {
        sink.lock().unwrap().push(line.text);
    });

    let second: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = second.clone();
    controller.start_monitor(None, move |line| {
        sink.lock().unwrap().push(line.text);
    });

    state.push_incoming(b"hello\n");
    tokio::time::sleep(Duration::from_millis(100)).await;
    controller.stop_monitor();

    assert!(first.lock().unwrap().is_empty());
    assert_eq!(second.lock().unwrap().clone(), ["hello".to_string()]);
}

#[tokio::test]
async fn disconnect_tears_everything_down_in_order() {
    let (controller, _state) = mock_controller();
    controller.set_auto_disable(Some(Duration::from_secs(30)));
    controller.enable_motor().await.unwrap();
    controller.start_monitor(None, |_line| {});

    controller.disconnect().await;

    assert!(!controller.auto_disable_pending());
    assert!(!controller.monitor_active());
    assert!(!controller.is_connected().await);
    assert_eq!(controller.motor_state(), MotorState::Disconnected);

    // Idempotent.
    controller.disconnect().await;
    assert!(!controller.is_connected().await);

    let err = controller.send_raw("?").await.unwrap_err();
    assert!(err.is_not_connected());
}

#[tokio::test]
async fn end_to_end_home_on_silent_device() {
    // Simulated device that echoes nothing: connect, home, verify the exact
    // command order and the final tracked position.
    let (controller, state) = mock_controller();

    let outcome = controller.home().await.unwrap();

    assert_eq!(outcome, SendOutcome::Accepted);
    assert_eq!(state.written(), ["M17\n", "G50\n"]);
    assert_eq!(controller.position(), 0.0);
}
