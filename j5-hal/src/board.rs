//! Boards: a physical device tied to its serial identity.
//!
//! A board owns exactly one backend and hands out components bound to it.
//! Boards compare and hash by serial number alone, so the same hardware
//! found by two separate discoveries is the same board.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::Serialize;

use crate::arduino::{
    ArduinoBackend, ConnectionState, ANALOGUE_PINS, DIGITAL_PINS, FIRST_ANALOGUE_PIN, SERVO_COUNT,
};
use crate::components::{GpioPin, Led, Servo, UltrasoundSensor};
use crate::error::Result;
use crate::hw_trait::{
    FirmwareModes, GpioPinInterface, GpioPinMode, PinModes, ServoInterface, ServoPosition,
};
use crate::tracing::prelude::*;

/// Behaviour shared by every kind of board.
pub trait Board: Send + Sync {
    /// Human readable board type.
    fn name(&self) -> &'static str;

    /// Serial number, unique per physical board.
    fn serial_number(&self) -> &str;

    /// Firmware version, once known.
    fn firmware_version(&self) -> Option<String>;

    /// Put every output into a state that cannot move or power anything.
    fn make_safe(&self) -> Result<()>;

    /// Summary for status output.
    fn info(&self) -> BoardInfo {
        BoardInfo {
            name: self.name(),
            serial_number: self.serial_number().to_string(),
            firmware_version: self.firmware_version(),
        }
    }
}

/// Serializable description of a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardInfo {
    pub name: &'static str,
    pub serial_number: String,
    pub firmware_version: Option<String>,
}

/// An Arduino Uno (or compatible) running SBDuino GPIO firmware.
#[derive(Clone)]
pub struct ArduinoUno {
    serial_number: String,
    backend: Arc<ArduinoBackend>,
}

impl ArduinoUno {
    pub const NAME: &'static str = "Arduino Uno";

    pub fn new(serial_number: impl Into<String>, backend: ArduinoBackend) -> Self {
        Self {
            serial_number: serial_number.into(),
            backend: Arc::new(backend),
        }
    }

    /// The backend driving this board.
    pub fn backend(&self) -> &Arc<ArduinoBackend> {
        &self.backend
    }

    /// A GPIO pin. Digital pins support the three digital modes and can
    /// host ultrasound sensors; analogue pins are analogue inputs.
    pub fn pin(&self, identifier: u8) -> Result<GpioPin<ArduinoBackend>> {
        // Validates the identifier.
        self.backend.get_gpio_pin_mode(identifier)?;

        let (hardware_modes, firmware_modes) = if identifier < FIRST_ANALOGUE_PIN {
            (
                PinModes::DIGITAL_INPUT | PinModes::DIGITAL_INPUT_PULLUP | PinModes::DIGITAL_OUTPUT,
                FirmwareModes::ULTRASOUND,
            )
        } else {
            (PinModes::ANALOGUE_INPUT, FirmwareModes::empty())
        };
        Ok(GpioPin::new(
            identifier,
            self.backend.clone(),
            hardware_modes,
            firmware_modes,
        ))
    }

    /// Every GPIO pin, in identifier order.
    pub fn pins(&self) -> Result<Vec<GpioPin<ArduinoBackend>>> {
        DIGITAL_PINS
            .chain(ANALOGUE_PINS)
            .map(|identifier| self.pin(identifier))
            .collect()
    }

    /// The on-board LED.
    pub fn led(&self) -> Led<ArduinoBackend> {
        Led::new(0, self.backend.clone())
    }

    /// A servo channel.
    pub fn servo(&self, identifier: u8) -> Result<Servo<ArduinoBackend>> {
        self.backend.get_servo_position(identifier)?;
        Ok(Servo::new(identifier, self.backend.clone()))
    }

    /// An ultrasound sensor on two of this board's pins.
    pub fn ultrasound_sensor(
        &self,
        trigger: u8,
        echo: u8,
        distance_mode: bool,
    ) -> Result<UltrasoundSensor<ArduinoBackend>> {
        UltrasoundSensor::new(self.pin(trigger)?, self.pin(echo)?, distance_mode)
    }

    /// Connection state of the backend.
    pub fn state(&self) -> ConnectionState {
        self.backend.state()
    }

    /// Close the connection. Components of this board fail from now on.
    pub fn close(&self) {
        self.backend.close();
    }
}

impl Board for ArduinoUno {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn serial_number(&self) -> &str {
        &self.serial_number
    }

    fn firmware_version(&self) -> Option<String> {
        Some(self.backend.firmware_version().to_string())
    }

    fn make_safe(&self) -> Result<()> {
        debug!("Making {} {} safe.", Self::NAME, self.serial_number);
        for pin in DIGITAL_PINS {
            self.backend.set_gpio_pin_mode(pin, GpioPinMode::DigitalInput)?;
        }
        for servo in 0..SERVO_COUNT as u8 {
            self.backend.set_servo_position(servo, ServoPosition::Unpowered)?;
        }
        Ok(())
    }
}

impl PartialEq for ArduinoUno {
    fn eq(&self, other: &Self) -> bool {
        self.serial_number == other.serial_number
    }
}

impl Eq for ArduinoUno {}

impl Hash for ArduinoUno {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.serial_number.hash(state);
    }
}

impl fmt::Debug for ArduinoUno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArduinoUno")
            .field("serial_number", &self.serial_number)
            .field("backend", &self.backend)
            .finish()
    }
}

impl fmt::Display for ArduinoUno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", Self::NAME, self.serial_number)
    }
}
