//! General purpose I/O pin.

use std::fmt;
use std::sync::Arc;

use super::Component;
use crate::error::{Error, Result};
use crate::hw_trait::{FirmwareModes, GpioPinInterface, GpioPinMode, PinModes};

/// A GPIO pin.
///
/// The pin knows which hardware modes it supports and which derived
/// components its board firmware can drive from it. Asking for a mode
/// outside the hardware set fails before the backend is involved.
pub struct GpioPin<B: GpioPinInterface + ?Sized> {
    identifier: u8,
    backend: Arc<B>,
    hardware_modes: PinModes,
    firmware_modes: FirmwareModes,
}

impl<B: GpioPinInterface + ?Sized> Clone for GpioPin<B> {
    fn clone(&self) -> Self {
        Self {
            identifier: self.identifier,
            backend: self.backend.clone(),
            hardware_modes: self.hardware_modes,
            firmware_modes: self.firmware_modes,
        }
    }
}

impl<B: GpioPinInterface + ?Sized> fmt::Debug for GpioPin<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpioPin")
            .field("identifier", &self.identifier)
            .field("hardware_modes", &self.hardware_modes)
            .field("firmware_modes", &self.firmware_modes)
            .finish()
    }
}

impl<B: GpioPinInterface + ?Sized> Component for GpioPin<B> {
    const NAME: &'static str = "GPIO pin";

    fn identifier(&self) -> u8 {
        self.identifier
    }
}

impl<B: GpioPinInterface + ?Sized> GpioPin<B> {
    pub fn new(
        identifier: u8,
        backend: Arc<B>,
        hardware_modes: PinModes,
        firmware_modes: FirmwareModes,
    ) -> Self {
        Self {
            identifier,
            backend,
            hardware_modes,
            firmware_modes,
        }
    }

    /// Backend driving this pin.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Hardware modes this pin supports.
    pub fn hardware_modes(&self) -> PinModes {
        self.hardware_modes
    }

    /// Derived components the firmware can drive from this pin.
    pub fn firmware_modes(&self) -> FirmwareModes {
        self.firmware_modes
    }

    /// Current hardware mode.
    pub fn mode(&self) -> Result<GpioPinMode> {
        self.backend.get_gpio_pin_mode(self.identifier)
    }

    /// Change the hardware mode.
    pub fn set_mode(&self, mode: GpioPinMode) -> Result<()> {
        self.require_support(mode)?;
        self.backend.set_gpio_pin_mode(self.identifier, mode)
    }

    /// Digital state of the pin.
    ///
    /// In output mode this is the last written state and nothing is read
    /// from the board. In an input mode the pin is read live.
    pub fn digital_read(&self) -> Result<bool> {
        let mode = self.mode()?;
        if mode == GpioPinMode::DigitalOutput {
            self.backend.get_gpio_pin_digital_state(self.identifier)
        } else if mode.is_digital_input() {
            self.backend.read_gpio_pin_digital_state(self.identifier)
        } else {
            Err(self.wrong_mode(mode, "digital read"))
        }
    }

    /// Drive the pin high or low. The pin must be a digital output.
    pub fn digital_write(&self, state: bool) -> Result<()> {
        self.require_support(GpioPinMode::DigitalOutput)?;
        self.backend.write_gpio_pin_digital_state(self.identifier, state)
    }

    /// Voltage on the pin. The pin must be an analogue input.
    pub fn analogue_read(&self) -> Result<f64> {
        self.require_mode(GpioPinMode::AnalogueInput, "analogue read")?;
        self.backend.read_gpio_pin_analogue_value(self.identifier)
    }

    /// Write a value between 0.0 and 1.0 to the pin's DAC.
    pub fn analogue_write(&self, scaled_value: f64) -> Result<()> {
        check_unit_range(scaled_value, "analogue value")?;
        self.require_mode(GpioPinMode::AnalogueOutput, "analogue write")?;
        self.backend.write_gpio_pin_dac_value(self.identifier, scaled_value)
    }

    /// Write a duty cycle between 0.0 and 1.0 to the pin's PWM output.
    pub fn pwm_write(&self, duty_cycle: f64) -> Result<()> {
        check_unit_range(duty_cycle, "duty cycle")?;
        self.require_mode(GpioPinMode::PwmOutput, "PWM write")?;
        self.backend.write_gpio_pin_pwm_value(self.identifier, duty_cycle)
    }

    fn require_support(&self, mode: GpioPinMode) -> Result<()> {
        if !self.hardware_modes.supports(mode) {
            return Err(Error::UnsupportedOperation(format!(
                "{} does not support {mode}",
                self.describe()
            )));
        }
        Ok(())
    }

    fn require_mode(&self, mode: GpioPinMode, operation: &str) -> Result<()> {
        self.require_support(mode)?;
        let current = self.mode()?;
        if current != mode {
            return Err(self.wrong_mode(current, operation));
        }
        Ok(())
    }

    fn wrong_mode(&self, mode: GpioPinMode, operation: &str) -> Error {
        Error::InvalidState(format!(
            "{operation} is not possible on {} in {mode} mode",
            self.describe()
        ))
    }
}

fn check_unit_range(value: f64, what: &str) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::OutOfRange(format!(
            "{what} {value} is outside 0.0 to 1.0"
        )));
    }
    Ok(())
}
