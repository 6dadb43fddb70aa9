//! # Turnkit Settings
//!
//! Configuration and command-history persistence. Remembers the serial port,
//! baud rate, default speed, and auto-disable timeout between sessions, plus
//! the interactive shell's command history. None of this affects protocol
//! correctness.

pub mod config;
pub mod history;

pub use config::{Config, ConnectionSettings, MotionSettings};
pub use history::{CommandHistory, MAX_HISTORY};
