//! Board discovery.
//!
//! Lists the serial ports of the machine, keeps the ones whose USB identity
//! belongs to a known Uno-compatible board, connects a backend to each and
//! pairs it with a board keyed by the port's serial number.
//!
//! Connecting runs the whole boot and firmware check, so it can fail per
//! port. [`FailurePolicy`] decides whether such a failure is skipped or
//! aborts discovery. Ports are independent, so they can be connected
//! concurrently; the results are gathered into one map either way.

use std::collections::{BTreeMap, HashSet};
use std::thread;

use crate::arduino::ArduinoBackend;
use crate::board::ArduinoUno;
use crate::config::{DiscoveryConfig, FailurePolicy};
use crate::error::Result;
use crate::tracing::prelude::*;
use crate::transport::{Connector, PortEnumerator, PortInfo, SerialConnector, SystemPorts, UsbId};

/// Discovered boards by serial number.
pub type BoardSet = BTreeMap<String, ArduinoUno>;

/// Registry of USB identities known to be Uno-compatible boards.
pub struct BoardRegistry {
    usb_boards: HashSet<UsbId>,
}

impl Default for BoardRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardRegistry {
    /// Create a new board registry with known boards.
    pub fn new() -> Self {
        let usb_boards = [
            UsbId { vid: 0x2341, pid: 0x0001 }, // Arduino Uno
            UsbId { vid: 0x2341, pid: 0x0043 }, // Arduino Uno R3
            UsbId { vid: 0x2a03, pid: 0x0043 }, // Arduino.org Uno R3
            UsbId { vid: 0x1a86, pid: 0x7523 }, // CH340 based clones
        ]
        .into_iter()
        .collect();

        Self { usb_boards }
    }

    /// Whether the port looks like one of our boards.
    pub fn matches(&self, port: &PortInfo) -> bool {
        port.usb_id
            .is_some_and(|usb_id| self.usb_boards.contains(&usb_id))
    }
}

/// Discover boards on this machine's serial ports.
pub fn discover_system(config: &DiscoveryConfig) -> Result<BoardSet> {
    discover(&SystemPorts, &SerialConnector, config)
}

/// Discover boards on the ports listed by `enumerator`, opening them with
/// `connector`.
pub fn discover(
    enumerator: &dyn PortEnumerator,
    connector: &dyn Connector,
    config: &DiscoveryConfig,
) -> Result<BoardSet> {
    let registry = BoardRegistry::new();
    let candidates = candidates(&registry, enumerator.ports()?);
    debug!("{} candidate ports.", candidates.len());

    let mut boards = BoardSet::new();

    if config.parallel {
        let attempts: Vec<(String, Result<ArduinoBackend>)> = thread::scope(|scope| {
            let handles: Vec<_> = candidates
                .iter()
                .map(|(serial, device)| {
                    let handle = scope.spawn(move || {
                        ArduinoBackend::connect(device, connector, config.backend.clone())
                    });
                    (serial.clone(), handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(serial, handle)| {
                    let result = handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic));
                    (serial, result)
                })
                .collect()
        });

        for (serial, result) in attempts {
            admit(&mut boards, serial, result, config.failure_policy)?;
        }
    } else {
        // Opening a port resets the board, so stop before touching the next
        // one once discovery is aborting.
        for (serial, device) in candidates {
            let result = ArduinoBackend::connect(&device, connector, config.backend.clone());
            admit(&mut boards, serial, result, config.failure_policy)?;
        }
    }

    Ok(boards)
}

// Add a connected board, or apply the failure policy to a failed one.
fn admit(
    boards: &mut BoardSet,
    serial: String,
    result: Result<ArduinoBackend>,
    policy: FailurePolicy,
) -> Result<()> {
    match result {
        Ok(backend) => {
            info!("Found {} {} on {}.", ArduinoUno::NAME, serial, backend.port());
            boards.insert(serial.clone(), ArduinoUno::new(serial, backend));
            Ok(())
        }
        Err(e) => match policy {
            FailurePolicy::Skip => {
                warn!("Skipping board {}: {}", serial, e);
                Ok(())
            }
            FailurePolicy::Abort => {
                error!("Discovery aborted at board {}: {}", serial, e);
                Err(e)
            }
        },
    }
}

// Matching ports as (serial number, device) pairs, one per serial number.
fn candidates(registry: &BoardRegistry, ports: Vec<PortInfo>) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for port in ports {
        if !registry.matches(&port) {
            trace!("Ignoring {}.", port.device);
            continue;
        }
        let Some(serial) = port.serial_number else {
            warn!("Ignoring {}: board reports no serial number.", port.device);
            continue;
        };
        if !seen.insert(serial.clone()) {
            warn!("Ignoring {}: board {} already found on another port.", port.device, serial);
            continue;
        }
        candidates.push((serial, port.device));
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::error::Error;
    use crate::transport::{LineTransport, SimulatedArduino};
    use parking_lot::Mutex;
    use std::io;

    const UNO: UsbId = UsbId { vid: 0x2341, pid: 0x0043 };
    const CLONE: UsbId = UsbId { vid: 0x1a86, pid: 0x7523 };
    const FTDI: UsbId = UsbId { vid: 0x0403, pid: 0x6001 };

    struct FakePorts(Vec<PortInfo>);

    impl PortEnumerator for FakePorts {
        fn ports(&self) -> Result<Vec<PortInfo>> {
            Ok(self.0.clone())
        }
    }

    // Devices whose path contains "hung" never boot, "missing" cannot be
    // opened, anything else is a healthy simulated board.
    struct SimConnector;

    impl Connector for SimConnector {
        fn connect(&self, device: &str, _config: &BackendConfig) -> Result<Box<dyn LineTransport>> {
            if device.contains("missing") {
                return Err(Error::Io(io::Error::new(io::ErrorKind::NotFound, device.to_string())));
            }
            let (sim, _handle) = if device.contains("hung") {
                SimulatedArduino::with_banner(std::iter::empty::<String>())
            } else {
                SimulatedArduino::new()
            };
            Ok(Box::new(sim))
        }
    }

    // Records every device it is asked to open.
    #[derive(Default)]
    struct RecordingConnector {
        opened: Mutex<Vec<String>>,
    }

    impl Connector for RecordingConnector {
        fn connect(&self, device: &str, config: &BackendConfig) -> Result<Box<dyn LineTransport>> {
            self.opened.lock().push(device.to_string());
            SimConnector.connect(device, config)
        }
    }

    fn port(device: &str, serial: Option<&str>, usb_id: Option<UsbId>) -> PortInfo {
        PortInfo {
            device: device.into(),
            serial_number: serial.map(Into::into),
            usb_id,
        }
    }

    fn ports() -> FakePorts {
        FakePorts(vec![
            port("/dev/ttyACM0", Some("UNO1"), Some(UNO)),
            port("/dev/ttyUSB0", Some("CLONE1"), Some(CLONE)),
            port("/dev/ttyUSB1", Some("FTDI1"), Some(FTDI)),
            port("/dev/ttyS0", None, None),
            port("/dev/ttyACM1", None, Some(UNO)),
        ])
    }

    fn serials(boards: &BoardSet) -> Vec<&str> {
        boards.keys().map(String::as_str).collect()
    }

    #[test]
    fn test_registry_matches() {
        let registry = BoardRegistry::new();
        assert!(registry.matches(&port("a", None, Some(UNO))));
        assert!(!registry.matches(&port("b", None, Some(FTDI))));
        assert!(!registry.matches(&port("c", None, None)));
    }

    #[test]
    fn test_discovers_matching_ports() {
        let boards = discover(&ports(), &SimConnector, &DiscoveryConfig::default()).unwrap();
        assert_eq!(serials(&boards), vec!["CLONE1", "UNO1"]);
        assert_eq!(boards["UNO1"].backend().port(), "/dev/ttyACM0");
    }

    #[test]
    fn test_repeated_discovery_finds_same_boards() {
        let first = discover(&ports(), &SimConnector, &DiscoveryConfig::default()).unwrap();
        let second = discover(&ports(), &SimConnector, &DiscoveryConfig::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_serial_numbers_collapse() {
        let ports = FakePorts(vec![
            port("/dev/ttyACM0", Some("UNO1"), Some(UNO)),
            port("/dev/ttyACM1", Some("UNO1"), Some(UNO)),
        ]);
        let boards = discover(&ports, &SimConnector, &DiscoveryConfig::default()).unwrap();
        assert_eq!(serials(&boards), vec!["UNO1"]);
        assert_eq!(boards["UNO1"].backend().port(), "/dev/ttyACM0");
    }

    fn failing_ports() -> FakePorts {
        FakePorts(vec![
            port("/dev/ttyACM0", Some("UNO1"), Some(UNO)),
            port("/dev/ttyACM-hung", Some("UNO2"), Some(UNO)),
            port("/dev/ttyACM-missing", Some("UNO3"), Some(UNO)),
            port("/dev/ttyUSB0", Some("CLONE1"), Some(CLONE)),
        ])
    }

    #[test]
    fn test_skip_policy() {
        let boards = discover(&failing_ports(), &SimConnector, &DiscoveryConfig::default()).unwrap();
        assert_eq!(serials(&boards), vec!["CLONE1", "UNO1"]);
    }

    #[test]
    fn test_abort_policy() {
        let config = DiscoveryConfig {
            failure_policy: FailurePolicy::Abort,
            ..DiscoveryConfig::default()
        };
        let result = discover(&failing_ports(), &SimConnector, &config);
        assert!(matches!(result, Err(Error::BoardUnresponsive(_))));
    }

    #[test]
    fn test_abort_stops_opening_ports() {
        let ports = FakePorts(vec![
            port("/dev/ttyACM-hung", Some("UNO1"), Some(UNO)),
            port("/dev/ttyACM1", Some("UNO2"), Some(UNO)),
            port("/dev/ttyACM2", Some("UNO3"), Some(UNO)),
        ]);
        let config = DiscoveryConfig {
            failure_policy: FailurePolicy::Abort,
            ..DiscoveryConfig::default()
        };
        let connector = RecordingConnector::default();

        assert!(discover(&ports, &connector, &config).is_err());
        assert_eq!(*connector.opened.lock(), vec!["/dev/ttyACM-hung"]);

        let connector = RecordingConnector::default();
        let boards = discover(&ports, &connector, &DiscoveryConfig::default()).unwrap();
        assert_eq!(serials(&boards), vec!["UNO2", "UNO3"]);
        assert_eq!(connector.opened.lock().len(), 3);
    }

    #[test]
    fn test_parallel_discovery() {
        let config = DiscoveryConfig {
            parallel: true,
            ..DiscoveryConfig::default()
        };
        let boards = discover(&failing_ports(), &SimConnector, &config).unwrap();
        assert_eq!(serials(&boards), vec!["CLONE1", "UNO1"]);

        let config = DiscoveryConfig {
            failure_policy: FailurePolicy::Abort,
            ..config
        };
        assert!(discover(&failing_ports(), &SimConnector, &config).is_err());
    }
}
