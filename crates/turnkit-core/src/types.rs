//! Shared data types for the turntable protocol.

/// Degrees per full rotation of the turntable.
pub const DEGREES_PER_TURN: f64 = 360.0;

/// Outcome of one command/response exchange.
///
/// The firmware answers many commands with one or more text lines, but some
/// (motor enable, position reset) are accepted silently. Silence within the
/// collection window is a valid success, distinct from a transport failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Command accepted, no textual reply arrived.
    Accepted,
    /// Reply lines, in arrival order.
    Lines(Vec<String>),
}

impl SendOutcome {
    /// Reply lines, empty for a silent accept.
    pub fn lines(&self) -> &[String] {
        match self {
            Self::Accepted => &[],
            Self::Lines(lines) => lines,
        }
    }

    /// True when the device stayed silent.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Rotation direction for relative moves.
///
/// On the Digitizer, positive angles rotate the platter counter-clockwise
/// (viewed from above).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Positive angular direction.
    #[default]
    CounterClockwise,
    /// Negative angular direction.
    Clockwise,
}

impl Direction {
    /// Sign applied to a relative angle in this direction.
    pub fn sign(self) -> f64 {
        match self {
            Self::CounterClockwise => 1.0,
            Self::Clockwise => -1.0,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CounterClockwise => write!(f, "counter-clockwise"),
            Self::Clockwise => write!(f, "clockwise"),
        }
    }
}

/// Last commanded motor state.
///
/// Tracked optimistically from the commands we send; the firmware never
/// reports it spontaneously. The firmware resets on port-open (DTR toggle),
/// which leaves the motor disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotorState {
    /// No open connection.
    #[default]
    Disconnected,
    /// No holding torque.
    Disabled,
    /// Holding torque, responsive to moves.
    Enabled,
}

impl std::fmt::Display for MotorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Disabled => write!(f, "disabled"),
            Self::Enabled => write!(f, "enabled"),
        }
    }
}
