//! Hobby servo.

use std::sync::Arc;

use super::Component;
use crate::error::Result;
use crate::hw_trait::{ServoInterface, ServoPosition};

/// A servo channel on a board.
pub struct Servo<B: ServoInterface + ?Sized> {
    identifier: u8,
    backend: Arc<B>,
}

impl<B: ServoInterface + ?Sized> Component for Servo<B> {
    const NAME: &'static str = "servo";

    fn identifier(&self) -> u8 {
        self.identifier
    }
}

impl<B: ServoInterface + ?Sized> Servo<B> {
    pub fn new(identifier: u8, backend: Arc<B>) -> Self {
        Self {
            identifier,
            backend,
        }
    }

    /// Last commanded position.
    pub fn position(&self) -> Result<ServoPosition> {
        self.backend.get_servo_position(self.identifier)
    }

    /// Move to a position between -1.0 and 1.0.
    pub fn set_position(&self, position: f32) -> Result<()> {
        self.backend
            .set_servo_position(self.identifier, ServoPosition::Position(position))
    }

    /// Stop driving the servo.
    pub fn unpower(&self) -> Result<()> {
        self.backend
            .set_servo_position(self.identifier, ServoPosition::Unpowered)
    }
}
