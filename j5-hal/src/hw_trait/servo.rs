//! Servo hardware abstraction trait.

use crate::error::Result;

/// Commanded servo position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ServoPosition {
    /// No position commanded; the servo is not driven.
    Unpowered,
    /// Position between -1.0 and 1.0.
    Position(f32),
}

impl ServoPosition {
    /// The position, if the servo is driven.
    pub fn position(self) -> Option<f32> {
        match self {
            ServoPosition::Unpowered => None,
            ServoPosition::Position(position) => Some(position),
        }
    }
}

/// Hobby servo abstraction
pub trait ServoInterface: Send + Sync {
    /// Get the last commanded position of a servo.
    fn get_servo_position(&self, identifier: u8) -> Result<ServoPosition>;

    /// Command a servo to a position, or unpower it.
    fn set_servo_position(&self, identifier: u8, position: ServoPosition) -> Result<()>;
}
