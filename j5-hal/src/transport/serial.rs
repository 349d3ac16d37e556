//! Serial port transport.
//!
//! Uses the blocking port API that tokio-serial re-exports from serialport.
//! Every exchange with a board is a short synchronous request/response, so
//! no async runtime is involved.

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use tokio_serial::{ClearBuffer, SerialPort, SerialPortType};

use super::{Connector, LineTransport, PortEnumerator, PortInfo, UsbId};
use crate::config::BackendConfig;
use crate::error::Result;
use crate::tracing::prelude::*;

/// Line transport over an open serial port.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    pending: Vec<u8>,
}

impl SerialTransport {
    /// Open `device` at the configured baud rate. Opening is bounded by the
    /// configured timeout; failure is returned as is, never retried.
    pub fn open(device: &str, config: &BackendConfig) -> Result<Self> {
        debug!("Opening {} at {} baud.", device, config.baud);
        let port = tokio_serial::new(device, config.baud)
            .timeout(config.timeout())
            .open()?;
        Ok(Self {
            port,
            pending: Vec::new(),
        })
    }

    // Split the first complete line off the receive buffer.
    fn take_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let raw: Vec<u8> = self.pending.drain(..=end).collect();
        let line = String::from_utf8_lossy(&raw);
        Some(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl LineTransport for SerialTransport {
    fn write_line(&mut self, line: &str) -> Result<()> {
        self.port.write_all(line.as_bytes())?;
        self.port.write_all(b"\n")?;
        self.port.flush()?;
        Ok(())
    }

    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>> {
        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; 128];

        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            self.port.set_timeout(remaining)?;
            match self.port.read(&mut chunk) {
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn discard_input(&mut self) -> Result<()> {
        self.pending.clear();
        self.port.clear(ClearBuffer::Input)?;
        Ok(())
    }
}

/// Opens real serial ports.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialConnector;

impl Connector for SerialConnector {
    fn connect(&self, device: &str, config: &BackendConfig) -> Result<Box<dyn LineTransport>> {
        Ok(Box::new(SerialTransport::open(device, config)?))
    }
}

/// Enumerates the serial ports of this machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPorts;

impl PortEnumerator for SystemPorts {
    fn ports(&self) -> Result<Vec<PortInfo>> {
        let ports = tokio_serial::available_ports()?;
        trace!("Found {} serial ports.", ports.len());

        Ok(ports
            .into_iter()
            .map(|port| match port.port_type {
                SerialPortType::UsbPort(usb) => PortInfo {
                    device: port.port_name,
                    serial_number: usb.serial_number,
                    usb_id: Some(UsbId {
                        vid: usb.vid,
                        pid: usb.pid,
                    }),
                },
                _ => PortInfo {
                    device: port.port_name,
                    serial_number: None,
                    usb_id: None,
                },
            })
            .collect())
    }
}
