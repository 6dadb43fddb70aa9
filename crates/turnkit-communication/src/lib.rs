//! # Turnkit Communication
//!
//! Serial transport, GRBL command channel, and turntable operations for
//! Turnkit. The MakerBot Digitizer's Horus 0.2 firmware is a GRBL
//! derivative: line-oriented G-code plus a handful of single-byte real-time
//! directives, all over 8-N-1 serial.

pub mod channel;
pub mod controller;
pub mod monitor;
pub mod transport;

pub use channel::{is_realtime, CommandChannel, IDLE_POLL, RESPONSE_SETTLE, RESPONSE_WINDOW};
pub use controller::{TurntableController, INTER_COMMAND_DELAY, POST_OPEN_SETTLE};
pub use monitor::{MonitorLine, MonitorSession, MONITOR_POLL};
pub use transport::{list_ports, SerialPortInfo, SerialTransport, Transport, READ_TIMEOUT};
