//! Hardware backend for boards running the SBDuino GPIO firmware.
//!
//! A backend owns one open connection and the pin state of the board on
//! the other end. Construction walks the connection through
//! `Connecting → AwaitingBoot → VerifyingFirmware → Ready`; any failure on
//! the way is returned and no backend exists. Once ready, every digital pin
//! is put into `DIGITAL_INPUT` so the board starts from a known state.
//!
//! Each command holds the line lock for its whole write/read exchange, so
//! callers on different threads queue behind each other. Mode and
//! last-written-state queries only take the short-lived pin table lock and
//! never wait for the line.

use std::fmt;

use parking_lot::Mutex;

use super::pins::{PinTable, DIGITAL_PINS};
use super::protocol::{self, Command, FirmwareVersion, ResponseLine, BOOTED_LINE, MINIMUM_FIRMWARE};
use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::hw_trait::{
    Distance, Echo, GpioPinInterface, GpioPinMode, LedInterface, ServoInterface, ServoPosition,
    UltrasoundInterface,
};
use crate::tracing::prelude::*;
use crate::transport::{Connector, LineTransport};

/// Number of servo channels the firmware drives.
pub const SERVO_COUNT: usize = 16;

/// Digital pin wired to the on-board LED.
pub const LED_PIN: u8 = 13;

/// Lifecycle of a backend's connection.
///
/// The intermediate states only exist while a backend is being
/// constructed; a constructed backend is `Ready` until closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    AwaitingBoot,
    VerifyingFirmware,
    Ready,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Backend for an Uno-layout board running SBDuino GPIO firmware.
pub struct ArduinoBackend {
    port: String,
    config: BackendConfig,
    firmware_version: FirmwareVersion,
    state: Mutex<ConnectionState>,
    line: Mutex<Option<Box<dyn LineTransport>>>,
    pins: Mutex<PinTable>,
    servos: Mutex<[ServoPosition; SERVO_COUNT]>,
}

impl fmt::Debug for ArduinoBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArduinoBackend")
            .field("port", &self.port)
            .field("firmware_version", &self.firmware_version)
            .field("state", &self.state())
            .finish()
    }
}

impl ArduinoBackend {
    /// Open `device` with `connector` and bring the board up.
    pub fn connect(device: &str, connector: &dyn Connector, config: BackendConfig) -> Result<Self> {
        debug!("{}: {} -> {}", device, ConnectionState::Disconnected, ConnectionState::Connecting);
        let transport = connector.connect(device, &config)?;
        Self::from_transport(device, transport, config)
    }

    /// Bring up a board over an already open transport.
    ///
    /// `port` names the connection in logs and error messages.
    pub fn from_transport(
        port: &str,
        mut transport: Box<dyn LineTransport>,
        config: BackendConfig,
    ) -> Result<Self> {
        debug!("{}: {} -> {}", port, ConnectionState::Connecting, ConnectionState::AwaitingBoot);
        let version_text = await_boot(port, transport.as_mut(), &config)?;

        debug!("{}: {} -> {}", port, ConnectionState::AwaitingBoot, ConnectionState::VerifyingFirmware);
        let firmware_version = verify_firmware(port, &version_text)?;

        debug!("{}: {} -> {}", port, ConnectionState::VerifyingFirmware, ConnectionState::Ready);
        let backend = Self {
            port: port.to_string(),
            config,
            firmware_version,
            state: Mutex::new(ConnectionState::Ready),
            line: Mutex::new(Some(transport)),
            pins: Mutex::new(PinTable::default()),
            servos: Mutex::new([ServoPosition::Unpowered; SERVO_COUNT]),
        };

        for pin in DIGITAL_PINS {
            backend.set_gpio_pin_mode(pin, GpioPinMode::DigitalInput)?;
        }

        info!("{}: SBDuino GPIO v{} ready.", port, firmware_version);
        Ok(backend)
    }

    /// Name of the port this backend is connected through.
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Firmware version reported during the handshake.
    pub fn firmware_version(&self) -> FirmwareVersion {
        self.firmware_version
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Release the connection. Every later operation fails with
    /// [`Error::Closed`]. Closing twice is harmless.
    pub fn close(&self) {
        let mut line = self.line.lock();
        if line.take().is_some() {
            *self.state.lock() = ConnectionState::Closed;
            info!("{}: connection closed.", self.port);
        }
    }

    // Run `f` with exclusive use of the line. Fails fast once closed.
    fn with_line<R>(&self, f: impl FnOnce(&mut dyn LineTransport) -> Result<R>) -> Result<R> {
        let mut line = self.line.lock();
        let transport = line
            .as_mut()
            .ok_or_else(|| Error::Closed(self.port.clone()))?;
        f(transport.as_mut())
    }

    // Send one command and collect its payload lines. `Ok(None)` means the
    // board did not finish answering within the timeout.
    fn transact(
        &self,
        transport: &mut dyn LineTransport,
        command: Command,
    ) -> Result<Option<Vec<String>>> {
        let text = command.to_string();
        transport.discard_input()?;
        trace!("{} -> {}", self.port, text);
        transport.write_line(&text)?;

        let mut payloads = Vec::new();
        loop {
            let Some(received) = transport.read_line(self.config.timeout())? else {
                return Ok(None);
            };
            trace!("{} <- {}", self.port, received);

            match ResponseLine::parse(&received)? {
                ResponseLine::Data(payload) => payloads.push(payload),
                ResponseLine::Ok(_) => return Ok(Some(payloads)),
                ResponseLine::Error(message) => {
                    return Err(Error::Communication(format!(
                        "{} rejected {:?}: {}",
                        self.port, text, message
                    )))
                }
                ResponseLine::Comment(_) => {}
            }
        }
    }

    // Like `transact`, but a missing response is an error.
    fn request(&self, transport: &mut dyn LineTransport, command: Command) -> Result<Vec<String>> {
        self.transact(transport, command)?.ok_or_else(|| {
            Error::BoardUnresponsive(format!("{} did not answer {:?}", self.port, command.to_string()))
        })
    }

    fn single_payload(&self, payloads: Vec<String>) -> Result<String> {
        match <[String; 1]>::try_from(payloads) {
            Ok([payload]) => Ok(payload),
            Err(payloads) => Err(Error::Communication(format!(
                "{} sent {} data lines where one was expected: {:?}",
                self.port,
                payloads.len(),
                payloads
            ))),
        }
    }

    // Shared exchange for `T` and `U`. The firmware reconfigures both pins
    // whether or not an echo arrives, so the pin table is updated even when
    // the answer times out. A command the board rejected changed nothing.
    fn ultrasound(&self, command: Command, trigger: u8, echo: u8) -> Result<Option<String>> {
        self.with_line(|line| {
            {
                let pins = self.pins.lock();
                pins.digital(trigger)?;
                pins.digital(echo)?;
            }

            let response = self.transact(line, command);
            if !matches!(response, Err(Error::Communication(_))) {
                self.pins.lock().record_ultrasound(trigger, echo)?;
            }

            match response? {
                Some(payloads) => self.single_payload(payloads).map(Some),
                None => {
                    debug!("{}: no answer to {}, treating as echo timeout.", self.port, command);
                    Ok(None)
                }
            }
        })
    }

    fn check_led(&self, identifier: u8) -> Result<()> {
        if identifier != 0 {
            return Err(Error::OutOfRange(format!(
                "{} only has LED 0 (digital pin {})",
                self.port, LED_PIN
            )));
        }
        Ok(())
    }

    fn servo_index(&self, identifier: u8) -> Result<usize> {
        let index = usize::from(identifier);
        if index >= SERVO_COUNT {
            return Err(Error::OutOfRange(format!(
                "there is no servo {identifier}, the board has {SERVO_COUNT}"
            )));
        }
        Ok(index)
    }
}

// Read lines until the version banner arrives.
fn await_boot(port: &str, transport: &mut dyn LineTransport, config: &BackendConfig) -> Result<String> {
    let mut empty_reads = 0;

    loop {
        let line = transport.read_line(config.timeout())?;
        let line = match line {
            Some(line) if !line.trim().is_empty() => line,
            _ => {
                empty_reads += 1;
                if empty_reads > config.boot_attempts {
                    return Err(Error::BoardUnresponsive(format!(
                        "{port} is not responding or runs custom firmware"
                    )));
                }
                continue;
            }
        };

        trace!("{} <- {}", port, line);
        if line.trim() == BOOTED_LINE {
            continue;
        }
        return match protocol::banner_version(&line) {
            Some(version) => Ok(version.to_string()),
            None => Err(Error::BoardUnresponsive(format!(
                "{port} sent an unexpected boot line {line:?}"
            ))),
        };
    }
}

fn verify_firmware(port: &str, version_text: &str) -> Result<FirmwareVersion> {
    let version: FirmwareVersion = version_text.parse()?;
    if version < MINIMUM_FIRMWARE {
        warn!("{}: firmware v{} is older than v{}.", port, version, MINIMUM_FIRMWARE);
        return Err(Error::FirmwareTooOld {
            found: version.to_string(),
            minimum: MINIMUM_FIRMWARE.to_string(),
        });
    }
    Ok(version)
}

impl GpioPinInterface for ArduinoBackend {
    fn set_gpio_pin_mode(&self, identifier: u8, mode: GpioPinMode) -> Result<()> {
        self.with_line(|line| {
            let Some(data) = self.pins.lock().plan_mode(identifier, mode)? else {
                return Ok(());
            };
            self.request(
                line,
                Command::WritePin {
                    pin: identifier,
                    drive: data.drive(),
                },
            )?;
            self.pins.lock().store(identifier, data)
        })
    }

    fn get_gpio_pin_mode(&self, identifier: u8) -> Result<GpioPinMode> {
        self.pins.lock().mode(identifier)
    }

    fn write_gpio_pin_digital_state(&self, identifier: u8, state: bool) -> Result<()> {
        self.with_line(|line| {
            let data = self.pins.lock().plan_write(identifier, state)?;
            self.request(
                line,
                Command::WritePin {
                    pin: identifier,
                    drive: data.drive(),
                },
            )?;
            self.pins.lock().store(identifier, data)
        })
    }

    fn get_gpio_pin_digital_state(&self, identifier: u8) -> Result<bool> {
        self.pins.lock().written_state(identifier)
    }

    fn read_gpio_pin_digital_state(&self, identifier: u8) -> Result<bool> {
        self.with_line(|line| {
            self.pins.lock().check_digital_read(identifier)?;
            let payloads = self.request(line, Command::ReadPin { pin: identifier })?;
            protocol::parse_digital(&self.single_payload(payloads)?)
        })
    }

    fn read_gpio_pin_analogue_value(&self, identifier: u8) -> Result<f64> {
        self.with_line(|line| {
            self.pins.lock().check_analogue_read(identifier)?;
            let payloads = self.request(line, Command::ReadAnalogue)?;
            protocol::parse_analogue(&payloads, identifier)
        })
    }

    fn write_gpio_pin_dac_value(&self, _identifier: u8, _scaled_value: f64) -> Result<()> {
        Err(Error::UnsupportedOperation(format!(
            "the board on {} does not have a DAC",
            self.port
        )))
    }

    fn write_gpio_pin_pwm_value(&self, _identifier: u8, _duty_cycle: f64) -> Result<()> {
        Err(Error::UnsupportedOperation(format!(
            "the firmware on {} does not implement PWM output",
            self.port
        )))
    }
}

impl LedInterface for ArduinoBackend {
    fn get_led_state(&self, identifier: u8) -> Result<bool> {
        self.check_led(identifier)?;
        self.get_gpio_pin_digital_state(LED_PIN)
    }

    fn set_led_state(&self, identifier: u8, state: bool) -> Result<()> {
        self.check_led(identifier)?;
        self.write_gpio_pin_digital_state(LED_PIN, state)
    }
}

impl ServoInterface for ArduinoBackend {
    fn get_servo_position(&self, identifier: u8) -> Result<ServoPosition> {
        let index = self.servo_index(identifier)?;
        Ok(self.servos.lock()[index])
    }

    fn set_servo_position(&self, identifier: u8, position: ServoPosition) -> Result<()> {
        let index = self.servo_index(identifier)?;
        let level = protocol::servo_level(position)?;
        self.with_line(|line| {
            self.request(
                line,
                Command::SetServo {
                    servo: identifier,
                    level,
                },
            )?;
            self.servos.lock()[index] = position;
            Ok(())
        })
    }
}

impl UltrasoundInterface for ArduinoBackend {
    fn get_ultrasound_pulse(&self, trigger_pin: u8, echo_pin: u8) -> Result<Echo> {
        let command = Command::UltrasoundPulse {
            trigger: trigger_pin,
            echo: echo_pin,
        };
        match self.ultrasound(command, trigger_pin, echo_pin)? {
            Some(payload) => protocol::parse_echo(&payload),
            None => Ok(Echo::Timeout),
        }
    }

    fn get_ultrasound_distance(&self, trigger_pin: u8, echo_pin: u8) -> Result<Distance> {
        let command = Command::UltrasoundDistance {
            trigger: trigger_pin,
            echo: echo_pin,
        };
        match self.ultrasound(command, trigger_pin, echo_pin)? {
            Some(payload) => protocol::parse_distance(&payload),
            None => Ok(Distance::Timeout),
        }
    }
}
