//! Physical transport layer for board connections.
//!
//! This module handles the raw connection to a board: enumerating serial
//! ports, opening them, and moving newline-terminated lines in both
//! directions. It has no knowledge of what the lines mean; the protocol
//! lives with the backend.
//!
//! The traits here are the seams tests and alternative transports plug
//! into. [`serial`] provides the real implementations, [`sim`] an
//! in-process board that speaks the same protocol.

pub mod serial;
pub mod sim;

use std::time::Duration;

use serde::Serialize;

use crate::config::BackendConfig;
use crate::error::Result;

pub use serial::{SerialConnector, SerialTransport, SystemPorts};
pub use sim::{SimHandle, SimulatedArduino};

/// A bidirectional, line-oriented connection to one board.
pub trait LineTransport: Send {
    /// Send one line. The terminator is added by the transport.
    fn write_line(&mut self, line: &str) -> Result<()>;

    /// Wait up to `timeout` for the next complete line, without its
    /// terminator. Returns `Ok(None)` if no line arrived in time.
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>>;

    /// Drop anything received but not yet read.
    fn discard_input(&mut self) -> Result<()>;
}

/// Opens transports by device path.
pub trait Connector: Sync {
    fn connect(&self, device: &str, config: &BackendConfig) -> Result<Box<dyn LineTransport>>;
}

/// Lists the serial ports currently present.
pub trait PortEnumerator {
    fn ports(&self) -> Result<Vec<PortInfo>>;
}

/// USB vendor and product IDs for board identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct UsbId {
    pub vid: u16,
    pub pid: u16,
}

impl std::fmt::Display for UsbId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vid, self.pid)
    }
}

/// A serial port as reported by the operating system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Device path, e.g. `/dev/ttyACM0`
    pub device: String,
    /// USB serial number, when the port is a USB device that reports one
    pub serial_number: Option<String>,
    /// USB identity, `None` for non-USB ports
    pub usb_id: Option<UsbId>,
}
