//! Ultrasonic distance sensor.
//!
//! A derived component: it is built from a trigger pin and an echo pin,
//! which may be the same pin on boards that support it. The firmware
//! drives the timing; the pins only have to declare ultrasound support.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::hw_trait::{Distance, Echo, FirmwareModes, GpioPinInterface, UltrasoundInterface};

use super::{Component, GpioPin};

/// Ultrasonic distance sensor on two GPIO pins.
pub struct UltrasoundSensor<B>
where
    B: GpioPinInterface + UltrasoundInterface + ?Sized,
{
    trigger: GpioPin<B>,
    echo: GpioPin<B>,
    distance_mode: bool,
}

impl<B> UltrasoundSensor<B>
where
    B: GpioPinInterface + UltrasoundInterface + ?Sized,
{
    /// Build a sensor from its pins.
    ///
    /// Both pins must belong to the same board and declare ultrasound
    /// firmware support. With `distance_mode` off only [`pulse`] is
    /// available.
    ///
    /// [`pulse`]: UltrasoundSensor::pulse
    pub fn new(trigger: GpioPin<B>, echo: GpioPin<B>, distance_mode: bool) -> Result<Self> {
        let supported = |pin: &GpioPin<B>| pin.firmware_modes().contains(FirmwareModes::ULTRASOUND);
        if !supported(&trigger) || !supported(&echo) {
            return Err(Error::NotSupportedByComponent(format!(
                "{} and {} must both support ultrasound",
                trigger.describe(),
                echo.describe()
            )));
        }
        if !Arc::ptr_eq(trigger.backend(), echo.backend()) {
            return Err(Error::NotSupportedByComponent(format!(
                "{} and {} are on different boards",
                trigger.describe(),
                echo.describe()
            )));
        }

        Ok(Self {
            trigger,
            echo,
            distance_mode,
        })
    }

    pub fn trigger_pin(&self) -> &GpioPin<B> {
        &self.trigger
    }

    pub fn echo_pin(&self) -> &GpioPin<B> {
        &self.echo
    }

    /// Send a pulse and time the echo.
    pub fn pulse(&self) -> Result<Echo> {
        self.trigger
            .backend()
            .get_ultrasound_pulse(self.trigger.identifier(), self.echo.identifier())
    }

    /// Send a pulse and measure the distance to the nearest object.
    pub fn distance(&self) -> Result<Distance> {
        if !self.distance_mode {
            return Err(Error::InvalidState(
                "distance mode is disabled, use pulse() to get the echo time".into(),
            ));
        }
        self.trigger
            .backend()
            .get_ultrasound_distance(self.trigger.identifier(), self.echo.identifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arduino::ArduinoBackend;
    use crate::config::BackendConfig;
    use crate::hw_trait::{GpioPinMode, PinModes};
    use crate::transport::{SimHandle, SimulatedArduino};
    use std::time::Duration;

    fn backend() -> (Arc<ArduinoBackend>, SimHandle) {
        let (sim, handle) = SimulatedArduino::new();
        let backend =
            ArduinoBackend::from_transport("sim", Box::new(sim), BackendConfig::default()).unwrap();
        handle.clear_commands();
        (Arc::new(backend), handle)
    }

    fn pin(backend: &Arc<ArduinoBackend>, identifier: u8, firmware: FirmwareModes) -> GpioPin<ArduinoBackend> {
        GpioPin::new(
            identifier,
            backend.clone(),
            PinModes::DIGITAL_INPUT | PinModes::DIGITAL_OUTPUT,
            firmware,
        )
    }

    #[test]
    fn test_requires_ultrasound_firmware() {
        let (backend, _handle) = backend();
        let result = UltrasoundSensor::new(
            pin(&backend, 3, FirmwareModes::ULTRASOUND),
            pin(&backend, 4, FirmwareModes::empty()),
            true,
        );
        assert!(matches!(result, Err(Error::NotSupportedByComponent(_))));
    }

    #[test]
    fn test_requires_same_board() {
        let (first, _) = backend();
        let (second, _) = backend();
        let result = UltrasoundSensor::new(
            pin(&first, 3, FirmwareModes::ULTRASOUND),
            pin(&second, 4, FirmwareModes::ULTRASOUND),
            true,
        );
        assert!(matches!(result, Err(Error::NotSupportedByComponent(_))));
    }

    #[test]
    fn test_pulse_and_distance() {
        let (backend, handle) = backend();
        handle.set_echo_micros(2345);
        handle.set_distance_metres(1.23);

        let sensor = UltrasoundSensor::new(
            pin(&backend, 3, FirmwareModes::ULTRASOUND),
            pin(&backend, 4, FirmwareModes::ULTRASOUND),
            true,
        )
        .unwrap();

        assert_eq!(sensor.pulse().unwrap(), Echo::Received(Duration::from_micros(2345)));
        let metres = sensor.distance().unwrap().metres().unwrap();
        assert!((metres - 1.23).abs() < 1e-9);
        assert_eq!(handle.commands(), vec!["T 3 4", "U 3 4"]);

        // The pins observe the reconfiguration the firmware performed.
        assert_eq!(sensor.trigger_pin().mode().unwrap(), GpioPinMode::DigitalOutput);
        assert!(!sensor.trigger_pin().digital_read().unwrap());
        assert_eq!(sensor.echo_pin().mode().unwrap(), GpioPinMode::DigitalInput);
    }

    #[test]
    fn test_pulse_only_mode() {
        let (backend, handle) = backend();
        handle.set_echo_micros(0);

        let sensor = UltrasoundSensor::new(
            pin(&backend, 5, FirmwareModes::ULTRASOUND),
            pin(&backend, 5, FirmwareModes::ULTRASOUND),
            false,
        )
        .unwrap();

        assert_eq!(sensor.pulse().unwrap(), Echo::Timeout);
        assert!(matches!(sensor.distance(), Err(Error::InvalidState(_))));
        assert_eq!(handle.commands(), vec!["T 5 5"]);
        assert_eq!(sensor.echo_pin().mode().unwrap(), GpioPinMode::DigitalInput);
    }
}
