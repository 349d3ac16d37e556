//! Arduino Uno-layout boards running the SBDuino GPIO firmware.
//!
//! - [`pins`]: pin ranges and the per-pin mode/state model
//! - [`protocol`]: the line protocol spoken over the serial port
//! - [`backend`]: the connection lifecycle and every capability the
//!   firmware offers

pub mod backend;
pub mod pins;
pub mod protocol;

pub use backend::{ArduinoBackend, ConnectionState, LED_PIN, SERVO_COUNT};
pub use pins::{ANALOGUE_PINS, DIGITAL_PINS, FIRST_ANALOGUE_PIN};
pub use protocol::{FirmwareVersion, MINIMUM_FIRMWARE};
