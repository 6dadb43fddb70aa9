//! # Turnkit Core
//!
//! Core types and error taxonomy for Turnkit. Provides the fundamental
//! abstractions shared by the communication layer, the settings layer, and
//! the front-ends.

pub mod error;
pub mod types;

pub use error::{CommandError, ConnectionError, Error, Result, TransportError};
pub use types::{Direction, MotorState, SendOutcome, DEGREES_PER_TURN};
