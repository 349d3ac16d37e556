//! LED hardware abstraction trait.

use crate::error::Result;

/// Single-colour LED abstraction
pub trait LedInterface: Send + Sync {
    /// Get whether an LED is lit.
    fn get_led_state(&self, identifier: u8) -> Result<bool>;

    /// Light or extinguish an LED.
    fn set_led_state(&self, identifier: u8, state: bool) -> Result<()>;
}
