//! Pin state model for Uno-layout boards.
//!
//! Digital pins 2 to 13 carry a mode and a last-written state. Pins 0 and
//! 1 are the serial line and are not exposed. Analogue pins A0 to A5
//! (identifiers 14 to 19) are analogue inputs only and carry no state.
//!
//! The checks here run before anything is sent to the board, so a
//! rejected operation never reaches the wire.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use super::protocol::PinDrive;
use crate::error::{Error, Result};
use crate::hw_trait::GpioPinMode;

/// Identifier of the first analogue pin, A0.
pub const FIRST_ANALOGUE_PIN: u8 = 14;

/// Identifiers of the digital pins.
pub const DIGITAL_PINS: RangeInclusive<u8> = 2..=13;

/// Identifiers of the analogue pins.
pub const ANALOGUE_PINS: RangeInclusive<u8> = FIRST_ANALOGUE_PIN..=19;

/// Which range a pin identifier falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinKind {
    Digital,
    Analogue,
}

/// Classify a pin identifier.
pub fn pin_kind(identifier: u8) -> Result<PinKind> {
    if DIGITAL_PINS.contains(&identifier) {
        Ok(PinKind::Digital)
    } else if ANALOGUE_PINS.contains(&identifier) {
        Ok(PinKind::Analogue)
    } else {
        Err(Error::OutOfRange(format!("there is no pin {identifier}")))
    }
}

/// Mode and last-written state of a digital pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitalPinData {
    pub mode: GpioPinMode,
    pub state: bool,
}

impl Default for DigitalPinData {
    fn default() -> Self {
        Self {
            mode: GpioPinMode::DigitalInput,
            state: false,
        }
    }
}

impl DigitalPinData {
    /// How the firmware must drive the pin to match this record.
    pub fn drive(&self) -> PinDrive {
        match self.mode {
            GpioPinMode::DigitalInputPullup => PinDrive::InputPullup,
            GpioPinMode::DigitalOutput if self.state => PinDrive::High,
            GpioPinMode::DigitalOutput => PinDrive::Low,
            _ => PinDrive::Input,
        }
    }
}

/// Modes a digital pin accepts.
const DIGITAL_MODES: [GpioPinMode; 3] = [
    GpioPinMode::DigitalInput,
    GpioPinMode::DigitalInputPullup,
    GpioPinMode::DigitalOutput,
];

/// Records of every digital pin, created once and never resized.
#[derive(Debug, Clone)]
pub struct PinTable {
    digital: BTreeMap<u8, DigitalPinData>,
}

impl Default for PinTable {
    fn default() -> Self {
        Self {
            digital: DIGITAL_PINS
                .map(|pin| (pin, DigitalPinData::default()))
                .collect(),
        }
    }
}

impl PinTable {
    /// Record of a digital pin.
    pub fn digital(&self, identifier: u8) -> Result<DigitalPinData> {
        match pin_kind(identifier)? {
            PinKind::Digital => Ok(self.digital[&identifier]),
            PinKind::Analogue => Err(Error::UnsupportedOperation(
                "digital functions are not supported on analogue pins".into(),
            )),
        }
    }

    /// Replace the record of a digital pin.
    pub fn store(&mut self, identifier: u8, data: DigitalPinData) -> Result<()> {
        self.digital(identifier)?;
        self.digital.insert(identifier, data);
        Ok(())
    }

    /// Current mode of any pin. Analogue pins are always analogue inputs.
    pub fn mode(&self, identifier: u8) -> Result<GpioPinMode> {
        match pin_kind(identifier)? {
            PinKind::Digital => Ok(self.digital[&identifier].mode),
            PinKind::Analogue => Ok(GpioPinMode::AnalogueInput),
        }
    }

    /// Check a mode change.
    ///
    /// Returns the record the pin will have once the change is on the wire,
    /// or `None` when there is nothing to send (an analogue pin set to
    /// analogue input).
    pub fn plan_mode(&self, identifier: u8, mode: GpioPinMode) -> Result<Option<DigitalPinData>> {
        match pin_kind(identifier)? {
            PinKind::Digital if DIGITAL_MODES.contains(&mode) => Ok(Some(DigitalPinData {
                mode,
                ..self.digital[&identifier]
            })),
            PinKind::Analogue if mode == GpioPinMode::AnalogueInput => Ok(None),
            _ => Err(Error::UnsupportedOperation(format!(
                "mode {mode} is not supported on pin {identifier}"
            ))),
        }
    }

    /// Check a digital write and return the resulting record.
    pub fn plan_write(&self, identifier: u8, state: bool) -> Result<DigitalPinData> {
        let data = self.digital(identifier)?;
        if data.mode != GpioPinMode::DigitalOutput {
            return Err(Error::InvalidState(format!(
                "pin {identifier} must be in DIGITAL_OUTPUT mode to set its state, not {}",
                data.mode
            )));
        }
        Ok(DigitalPinData { state, ..data })
    }

    /// Last written state of an output pin.
    pub fn written_state(&self, identifier: u8) -> Result<bool> {
        let data = self.digital(identifier)?;
        if data.mode != GpioPinMode::DigitalOutput {
            return Err(Error::InvalidState(format!(
                "pin {identifier} must be in DIGITAL_OUTPUT mode to get its written state, not {}",
                data.mode
            )));
        }
        Ok(data.state)
    }

    /// Check that a live digital read is allowed.
    pub fn check_digital_read(&self, identifier: u8) -> Result<()> {
        let data = self.digital(identifier)?;
        if !data.mode.is_digital_input() {
            return Err(Error::InvalidState(format!(
                "pin {identifier} must be in a DIGITAL_INPUT mode to be read, not {}",
                data.mode
            )));
        }
        Ok(())
    }

    /// Check that an analogue read is allowed.
    pub fn check_analogue_read(&self, identifier: u8) -> Result<()> {
        match pin_kind(identifier)? {
            PinKind::Analogue => Ok(()),
            PinKind::Digital => Err(Error::UnsupportedOperation(
                "analogue functions are not supported on digital pins".into(),
            )),
        }
    }

    /// Record the modes the firmware forces while taking an ultrasound
    /// reading: trigger becomes a low output, then echo becomes an input.
    /// When both are the same pin it ends as an input.
    pub fn record_ultrasound(&mut self, trigger: u8, echo: u8) -> Result<()> {
        self.store(
            trigger,
            DigitalPinData {
                mode: GpioPinMode::DigitalOutput,
                state: false,
            },
        )?;
        self.store(
            echo,
            DigitalPinData {
                mode: GpioPinMode::DigitalInput,
                state: false,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_initial_table() {
        let table = PinTable::default();
        for pin in DIGITAL_PINS {
            assert_eq!(table.digital(pin).unwrap(), DigitalPinData::default());
        }
    }

    #[test_case(0)]
    #[test_case(1)]
    #[test_case(20)]
    #[test_case(255)]
    fn test_unknown_pins(pin: u8) {
        assert!(matches!(pin_kind(pin), Err(Error::OutOfRange(_))));
        assert!(PinTable::default().mode(pin).is_err());
    }

    #[test_case(GpioPinMode::DigitalInput)]
    #[test_case(GpioPinMode::DigitalInputPullup)]
    #[test_case(GpioPinMode::DigitalInputPulldown)]
    #[test_case(GpioPinMode::DigitalOutput)]
    #[test_case(GpioPinMode::AnalogueOutput)]
    #[test_case(GpioPinMode::PwmOutput)]
    fn test_analogue_pins_reject_other_modes(mode: GpioPinMode) {
        let table = PinTable::default();
        for pin in ANALOGUE_PINS {
            assert!(matches!(
                table.plan_mode(pin, mode),
                Err(Error::UnsupportedOperation(_))
            ));
        }
    }

    #[test]
    fn test_analogue_input_is_noop() {
        let table = PinTable::default();
        for pin in ANALOGUE_PINS {
            assert_eq!(table.plan_mode(pin, GpioPinMode::AnalogueInput).unwrap(), None);
            assert_eq!(table.mode(pin).unwrap(), GpioPinMode::AnalogueInput);
        }
    }

    #[test_case(GpioPinMode::DigitalInputPulldown)]
    #[test_case(GpioPinMode::AnalogueInput)]
    #[test_case(GpioPinMode::AnalogueOutput)]
    #[test_case(GpioPinMode::PwmOutput)]
    fn test_digital_pins_reject_unsupported_modes(mode: GpioPinMode) {
        let table = PinTable::default();
        assert!(matches!(
            table.plan_mode(5, mode),
            Err(Error::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_write_requires_output() {
        let mut table = PinTable::default();
        for mode in [GpioPinMode::DigitalInput, GpioPinMode::DigitalInputPullup] {
            let data = table.plan_mode(7, mode).unwrap().unwrap();
            table.store(7, data).unwrap();
            assert!(matches!(table.plan_write(7, true), Err(Error::InvalidState(_))));
            assert!(matches!(table.written_state(7), Err(Error::InvalidState(_))));
        }

        let data = table.plan_mode(7, GpioPinMode::DigitalOutput).unwrap().unwrap();
        table.store(7, data).unwrap();
        let data = table.plan_write(7, true).unwrap();
        assert_eq!(data.drive(), PinDrive::High);
        table.store(7, data).unwrap();
        assert!(table.written_state(7).unwrap());
    }

    #[test]
    fn test_digital_ops_on_analogue_pins() {
        let table = PinTable::default();
        assert!(matches!(
            table.plan_write(14, true),
            Err(Error::UnsupportedOperation(_))
        ));
        assert!(matches!(
            table.check_digital_read(15),
            Err(Error::UnsupportedOperation(_))
        ));
        assert!(matches!(
            table.check_analogue_read(13),
            Err(Error::UnsupportedOperation(_))
        ));
        assert!(table.check_analogue_read(19).is_ok());
    }

    #[test]
    fn test_drive_codes() {
        let mut data = DigitalPinData::default();
        assert_eq!(data.drive(), PinDrive::Input);
        data.mode = GpioPinMode::DigitalInputPullup;
        assert_eq!(data.drive(), PinDrive::InputPullup);
        data.mode = GpioPinMode::DigitalOutput;
        assert_eq!(data.drive(), PinDrive::Low);
        data.state = true;
        assert_eq!(data.drive(), PinDrive::High);
    }

    #[test]
    fn test_record_ultrasound() {
        let mut table = PinTable::default();
        table.record_ultrasound(3, 4).unwrap();
        assert_eq!(table.mode(3).unwrap(), GpioPinMode::DigitalOutput);
        assert!(!table.written_state(3).unwrap());
        assert_eq!(table.mode(4).unwrap(), GpioPinMode::DigitalInput);

        table.record_ultrasound(6, 6).unwrap();
        assert_eq!(table.mode(6).unwrap(), GpioPinMode::DigitalInput);
    }
}
