//! Serial transport for the turntable connection
//!
//! Owns the physical/virtual serial link: open, close, raw byte movement,
//! and discarding of stale input. The Digitizer talks 8-N-1 at 115200 baud
//! by default.
//!
//! Supports:
//! - Port enumeration with USB metadata
//! - Blocking-with-timeout line reads
//! - Input buffer draining before a new exchange

use std::io::{self, Read, Write};
use std::time::Duration;

use turnkit_core::{ConnectionError, Result, TransportError};

/// Read timeout on the open port. The firmware answers well within this.
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port_name: String,

    /// Port description (e.g., "USB Serial Port")
    pub description: String,

    /// Manufacturer name if available
    pub manufacturer: Option<String>,

    /// USB vendor ID if applicable
    pub vid: Option<u16>,

    /// USB product ID if applicable
    pub pid: Option<u16>,
}

impl SerialPortInfo {
    /// Create a new port info
    pub fn new(port_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            description: description.into(),
            manufacturer: None,
            vid: None,
            pid: None,
        }
    }

    /// Set manufacturer
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    /// Set USB IDs
    pub fn with_usb_ids(mut self, vid: u16, pid: u16) -> Self {
        self.vid = Some(vid);
        self.pid = Some(pid);
        self
    }
}

/// List serial ports the turntable could be attached to
///
/// Filters to USB-serial device patterns:
/// - Windows: COM* (e.g., COM1, COM3)
/// - Linux: /dev/ttyUSB*, /dev/ttyACM*
/// - macOS: /dev/cu.usbserial-*, /dev/cu.usbmodem*
pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
    let ports = serialport::available_ports().map_err(|e| ConnectionError::EnumerationFailed {
        reason: e.to_string(),
    })?;

    Ok(ports
        .iter()
        .filter(|port| is_usb_serial_port(&port.port_name))
        .map(|port| {
            let info = SerialPortInfo::new(&port.port_name, port_description(port));
            match &port.port_type {
                serialport::SerialPortType::UsbPort(usb) => {
                    let mut info = info.with_usb_ids(usb.vid, usb.pid);
                    if let Some(ref mfg) = usb.manufacturer {
                        info = info.with_manufacturer(mfg);
                    }
                    info
                }
                _ => info,
            }
        })
        .collect())
}

/// Check if a port name matches USB-serial device patterns
fn is_usb_serial_port(port_name: &str) -> bool {
    if port_name.starts_with("COM") && port_name[3..].chars().all(|c| c.is_ascii_digit()) {
        return true;
    }

    if port_name.starts_with("/dev/ttyUSB") || port_name.starts_with("/dev/ttyACM") {
        return true;
    }

    if port_name.starts_with("/dev/cu.usbserial-") || port_name.starts_with("/dev/cu.usbmodem") {
        return true;
    }

    false
}

/// Get a user-friendly description for a port
fn port_description(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb) => format!(
            "USB {} {}",
            usb.manufacturer.as_deref().unwrap_or("Device"),
            usb.product.as_deref().unwrap_or("Serial Port")
        ),
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}

/// Raw byte movement over the turntable connection.
///
/// Implementations must not be used after `close()`; every method on a closed
/// transport fails with `TransportError::NotConnected`.
pub trait Transport: Send {
    /// Write raw bytes to the device.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Number of bytes buffered but not yet read. Non-blocking.
    fn bytes_available(&mut self) -> Result<usize>;

    /// Read one line, blocking up to the read timeout.
    ///
    /// The trailing newline is consumed; a carriage return is left for the
    /// caller to trim. Bytes that do not decode as UTF-8 surface as
    /// `TransportError::Decode`, which callers recover from by skipping the
    /// line.
    fn read_line(&mut self) -> Result<String>;

    /// Drop any buffered-but-unread input.
    fn discard_input(&mut self) -> Result<()>;

    /// Release the connection. Idempotent.
    fn close(&mut self);
}

/// Real serial connection using the serialport crate.
pub struct SerialTransport {
    port: Option<Box<dyn serialport::SerialPort>>,
    name: String,
}

impl SerialTransport {
    /// Open `port_name` at `baud_rate`, 8 data bits, no parity, 1 stop bit.
    ///
    /// The firmware resets when the port opens (DTR toggle); callers must
    /// allow it a settle delay before the first command.
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self> {
        let builder = serialport::new(port_name, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(READ_TIMEOUT);

        match builder.open() {
            Ok(port) => {
                tracing::info!(port = port_name, baud = baud_rate, "serial port open");
                Ok(Self {
                    port: Some(port),
                    name: port_name.to_string(),
                })
            }
            Err(e) => {
                tracing::warn!(port = port_name, error = %e, "failed to open serial port");
                Err(map_open_error(port_name, &e).into())
            }
        }
    }

    /// Name of the underlying port.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn serialport::SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| TransportError::NotConnected.into())
    }
}

fn map_open_error(port_name: &str, e: &serialport::Error) -> ConnectionError {
    match e.kind() {
        serialport::ErrorKind::NoDevice => ConnectionError::PortNotFound {
            port: port_name.to_string(),
        },
        serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied) => {
            ConnectionError::PermissionDenied {
                port: port_name.to_string(),
            }
        }
        _ => ConnectionError::FailedToOpen {
            port: port_name.to_string(),
            reason: e.to_string(),
        },
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let port = self.port_mut()?;
        port.write_all(bytes).map_err(|e| {
            TransportError::Write {
                reason: e.to_string(),
            }
            .into()
        })
    }

    fn bytes_available(&mut self) -> Result<usize> {
        let port = self.port_mut()?;
        port.bytes_to_read().map(|n| n as usize).map_err(|e| {
            TransportError::Read {
                reason: e.to_string(),
            }
            .into()
        })
    }

    fn read_line(&mut self) -> Result<String> {
        let port = self.port_mut()?;
        let mut buf = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    if byte[0] == b'\n' {
                        break;
                    }
                    buf.push(byte[0]);
                }
                // Timed out mid-line: hand back what arrived, like a
                // serial readline with a deadline.
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) => {
                    return Err(TransportError::Read {
                        reason: e.to_string(),
                    }
                    .into())
                }
            }
        }

        String::from_utf8(buf).map_err(|e| {
            TransportError::Decode {
                reason: e.to_string(),
            }
            .into()
        })
    }

    fn discard_input(&mut self) -> Result<()> {
        let port = self.port_mut()?;
        port.clear(serialport::ClearBuffer::Input).map_err(|e| {
            TransportError::Read {
                reason: e.to_string(),
            }
            .into()
        })
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            tracing::info!(port = %self.name, "serial port closed");
        }
    }
}
