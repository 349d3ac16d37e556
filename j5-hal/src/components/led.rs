//! Single-colour LED.

use std::sync::Arc;

use super::Component;
use crate::error::Result;
use crate::hw_trait::LedInterface;

/// An LED on a board.
pub struct Led<B: LedInterface + ?Sized> {
    identifier: u8,
    backend: Arc<B>,
}

impl<B: LedInterface + ?Sized> Component for Led<B> {
    const NAME: &'static str = "LED";

    fn identifier(&self) -> u8 {
        self.identifier
    }
}

impl<B: LedInterface + ?Sized> Led<B> {
    pub fn new(identifier: u8, backend: Arc<B>) -> Self {
        Self {
            identifier,
            backend,
        }
    }

    /// Whether the LED is lit.
    pub fn state(&self) -> Result<bool> {
        self.backend.get_led_state(self.identifier)
    }

    pub fn set_state(&self, state: bool) -> Result<()> {
        self.backend.set_led_state(self.identifier, state)
    }
}
