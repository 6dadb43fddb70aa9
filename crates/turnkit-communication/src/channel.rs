//! Command channel and response collector
//!
//! One full request/response exchange per `send()` call: drain stale input,
//! frame the command, write it, then collect the device's reply lines within
//! a bounded window. The channel is not reentrant; the controller serializes
//! access to it behind a mutex.

use std::time::Duration;

use turnkit_core::{Result, SendOutcome, TransportError};

use crate::transport::Transport;

/// Pause after writing a command before the first read. Firmware response
/// latency is not instantaneous; reading immediately would race it.
pub const RESPONSE_SETTLE: Duration = Duration::from_millis(200);

/// Absolute wall-clock bound on response collection for one exchange.
pub const RESPONSE_WINDOW: Duration = Duration::from_millis(1000);

/// Idle poll interval inside the collection loop. Two consecutive empty
/// polls end the exchange early, keeping latency low for single-line replies.
pub const IDLE_POLL: Duration = Duration::from_millis(50);

/// GRBL real-time directives: single bytes sent unterminated, taking effect
/// immediately and bypassing the firmware's command queue.
const REALTIME_DIRECTIVES: [&str; 4] = ["?", "~", "!", "\x18"];

/// Frames commands over a [`Transport`] and collects their replies.
pub struct CommandChannel {
    transport: Option<Box<dyn Transport>>,
}

impl CommandChannel {
    /// New channel with no connection.
    pub fn new() -> Self {
        Self { transport: None }
    }

    /// New channel over an already-open transport.
    pub fn with_transport(transport: Box<dyn Transport>) -> Self {
        Self {
            transport: Some(transport),
        }
    }

    /// Attach an open transport, replacing (and closing) any previous one.
    pub fn attach(&mut self, transport: Box<dyn Transport>) {
        self.close();
        self.transport = Some(transport);
    }

    /// Close and drop the transport. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
    }

    /// Whether a transport is attached.
    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Drop any buffered-but-unread device output.
    pub fn discard_input(&mut self) -> Result<()> {
        self.transport_mut()?.discard_input()
    }

    /// One full command/response exchange.
    ///
    /// Writes the framed command, waits [`RESPONSE_SETTLE`], then collects
    /// reply lines until [`RESPONSE_WINDOW`] elapses or the device goes idle.
    /// A device that stays silent yields [`SendOutcome::Accepted`] — a valid
    /// success, not a failure.
    pub async fn send(&mut self, command: &str) -> Result<SendOutcome> {
        let framed = frame(command);
        {
            let transport = self.transport_mut()?;
            transport.discard_input()?;
            transport.write(&framed)?;
        }
        tracing::debug!(command = command.trim_end(), "sent");

        tokio::time::sleep(RESPONSE_SETTLE).await;

        let mut lines = Vec::new();
        let deadline = tokio::time::Instant::now() + RESPONSE_WINDOW;
        while tokio::time::Instant::now() < deadline {
            if self.transport_mut()?.bytes_available()? > 0 {
                match self.transport_mut()?.read_line() {
                    Ok(line) => {
                        let line = line.trim();
                        if !line.is_empty() {
                            tracing::debug!(response = line, "received");
                            lines.push(line.to_string());
                        }
                    }
                    Err(e) if e.is_decode() => {
                        tracing::debug!("skipping undecodable response line");
                    }
                    Err(e) => return Err(e),
                }
            } else {
                tokio::time::sleep(IDLE_POLL).await;
                if self.transport_mut()?.bytes_available()? == 0 {
                    break;
                }
            }
        }

        if lines.is_empty() {
            Ok(SendOutcome::Accepted)
        } else {
            Ok(SendOutcome::Lines(lines))
        }
    }

    /// Single non-blocking poll for one buffered line, for the monitor.
    ///
    /// Returns `Ok(None)` when nothing is buffered, when no transport is
    /// attached, or when an undecodable line was skipped.
    pub fn poll_line(&mut self) -> Result<Option<String>> {
        let Some(transport) = self.transport.as_mut() else {
            return Ok(None);
        };
        if transport.bytes_available()? == 0 {
            return Ok(None);
        }
        match transport.read_line() {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(line.to_string()))
                }
            }
            Err(e) if e.is_decode() => {
                tracing::debug!("skipping undecodable monitored line");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn transport_mut(&mut self) -> Result<&mut Box<dyn Transport>> {
        self.transport
            .as_mut()
            .ok_or_else(|| TransportError::NotConnected.into())
    }
}

impl Default for CommandChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// True for the single-byte GRBL real-time directives.
pub fn is_realtime(command: &str) -> bool {
    REALTIME_DIRECTIVES.contains(&command)
}

/// Frame a command for transmission: append exactly one line terminator
/// unless it is already terminated or is a real-time directive (sent raw).
fn frame(command: &str) -> Vec<u8> {
    let mut bytes = command.as_bytes().to_vec();
    if !is_realtime(command) && !command.ends_with('\n') {
        bytes.push(b'\n');
    }
    bytes
}
