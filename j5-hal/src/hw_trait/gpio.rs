//! GPIO hardware abstraction trait.

use bitflags::bitflags;
use strum::{Display, EnumString};

use crate::error::{Error, Result};

/// GPIO pin mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GpioPinMode {
    DigitalInput,
    DigitalInputPullup,
    DigitalInputPulldown,
    DigitalOutput,
    AnalogueInput,
    AnalogueOutput,
    PwmOutput,
}

impl GpioPinMode {
    /// The flag for this mode in a [`PinModes`] set.
    pub fn flag(self) -> PinModes {
        match self {
            GpioPinMode::DigitalInput => PinModes::DIGITAL_INPUT,
            GpioPinMode::DigitalInputPullup => PinModes::DIGITAL_INPUT_PULLUP,
            GpioPinMode::DigitalInputPulldown => PinModes::DIGITAL_INPUT_PULLDOWN,
            GpioPinMode::DigitalOutput => PinModes::DIGITAL_OUTPUT,
            GpioPinMode::AnalogueInput => PinModes::ANALOGUE_INPUT,
            GpioPinMode::AnalogueOutput => PinModes::ANALOGUE_OUTPUT,
            GpioPinMode::PwmOutput => PinModes::PWM_OUTPUT,
        }
    }

    /// True for the modes in which a live digital read is meaningful.
    pub fn is_digital_input(self) -> bool {
        matches!(
            self,
            GpioPinMode::DigitalInput
                | GpioPinMode::DigitalInputPullup
                | GpioPinMode::DigitalInputPulldown
        )
    }
}

bitflags! {
    /// A set of hardware pin modes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PinModes: u8 {
        const DIGITAL_INPUT = 1 << 0;
        const DIGITAL_INPUT_PULLUP = 1 << 1;
        const DIGITAL_INPUT_PULLDOWN = 1 << 2;
        const DIGITAL_OUTPUT = 1 << 3;
        const ANALOGUE_INPUT = 1 << 4;
        const ANALOGUE_OUTPUT = 1 << 5;
        const PWM_OUTPUT = 1 << 6;
    }
}

impl PinModes {
    /// Whether `mode` is in this set.
    pub fn supports(self, mode: GpioPinMode) -> bool {
        self.contains(mode.flag())
    }
}

bitflags! {
    /// Derived components the board firmware can drive from a pin.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FirmwareModes: u8 {
        const ULTRASOUND = 1 << 0;
    }
}

/// GPIO pin abstraction.
///
/// Identifiers are board-defined pin numbers.
pub trait GpioPinInterface: Send + Sync {
    /// Set the hardware mode of a pin.
    fn set_gpio_pin_mode(&self, identifier: u8, mode: GpioPinMode) -> Result<()>;

    /// Get the hardware mode of a pin. Never touches the wire.
    fn get_gpio_pin_mode(&self, identifier: u8) -> Result<GpioPinMode>;

    /// Write the digital state of a pin in output mode.
    fn write_gpio_pin_digital_state(&self, identifier: u8, state: bool) -> Result<()>;

    /// Get the last written digital state of a pin in output mode. Never
    /// touches the wire.
    fn get_gpio_pin_digital_state(&self, identifier: u8) -> Result<bool>;

    /// Read the live digital state of a pin in an input mode.
    fn read_gpio_pin_digital_state(&self, identifier: u8) -> Result<bool>;

    /// Read the voltage on an analogue pin.
    fn read_gpio_pin_analogue_value(&self, identifier: u8) -> Result<f64>;

    /// Write a scaled value (0.0 to 1.0) to the pin's DAC.
    fn write_gpio_pin_dac_value(&self, identifier: u8, _scaled_value: f64) -> Result<()> {
        Err(Error::UnsupportedOperation(format!(
            "pin {identifier} has no DAC"
        )))
    }

    /// Write a duty cycle (0.0 to 1.0) to the pin's PWM output.
    fn write_gpio_pin_pwm_value(&self, identifier: u8, _duty_cycle: f64) -> Result<()> {
        Err(Error::UnsupportedOperation(format!(
            "pin {identifier} has no PWM output"
        )))
    }
}
