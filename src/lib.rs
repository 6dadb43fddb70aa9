//! # Turnkit
//!
//! Serial G-code controller for the MakerBot Digitizer turntable. The
//! Digitizer's Horus 0.2 firmware is a GRBL derivative driven over 8-N-1
//! serial: a handful of motion/mode G-codes (`M17`, `M18`, `G50`, `G1`) plus
//! the GRBL real-time single-byte directives and `$`-prefixed system
//! commands.
//!
//! ## Architecture
//!
//! Turnkit is organized as a workspace:
//!
//! 1. **turnkit-core** - Error taxonomy and shared types
//! 2. **turnkit-communication** - Serial transport, command channel,
//!    turntable operations, continuous monitor
//! 3. **turnkit-settings** - Configuration and command-history files
//! 4. **turnkit** - The CLI binary (one-shot flags and interactive shell)
//!
//! The firmware never reports its angle spontaneously, so the controller
//! keeps a commanded-position ledger: every move updates the tracked
//! position optimistically, trusting the firmware to execute it.

pub use turnkit_communication::{
    list_ports, CommandChannel, MonitorLine, SerialPortInfo, SerialTransport, Transport,
    TurntableController,
};
pub use turnkit_core::{
    CommandError, ConnectionError, Direction, Error, MotorState, Result, SendOutcome,
    TransportError, DEGREES_PER_TURN,
};
pub use turnkit_settings::{CommandHistory, Config, ConnectionSettings, MotionSettings};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging on stderr, honoring the RUST_LOG environment
/// variable and defaulting to INFO. Stdout stays clean for device responses.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
