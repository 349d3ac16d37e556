//! Ultrasound distance sensor abstraction trait.

use std::time::Duration;

use crate::error::Result;

/// Outcome of an ultrasound pulse.
///
/// A timeout means no echo came back, which happens whenever nothing is in
/// range. It is an ordinary reading, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Echo {
    Received(Duration),
    Timeout,
}

impl Echo {
    /// The echo time, if an echo was received.
    pub fn duration(self) -> Option<Duration> {
        match self {
            Echo::Received(duration) => Some(duration),
            Echo::Timeout => None,
        }
    }
}

/// Outcome of an ultrasound distance measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distance {
    /// Distance to the nearest object, in metres.
    Measured(f64),
    Timeout,
}

impl Distance {
    /// The distance in metres, if one was measured.
    pub fn metres(self) -> Option<f64> {
        match self {
            Distance::Measured(metres) => Some(metres),
            Distance::Timeout => None,
        }
    }
}

/// Ultrasound sensor abstraction.
///
/// Taking a reading reconfigures both pins: the trigger pin ends as a low
/// digital output and the echo pin as a digital input. Implementations must
/// record that change in their pin state.
pub trait UltrasoundInterface: Send + Sync {
    /// Send a pulse and time its echo.
    fn get_ultrasound_pulse(&self, trigger_pin: u8, echo_pin: u8) -> Result<Echo>;

    /// Send a pulse and let the board convert the echo time into a distance.
    fn get_ultrasound_distance(&self, trigger_pin: u8, echo_pin: u8) -> Result<Distance>;
}
