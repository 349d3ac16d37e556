//! Components: the logical devices a robot program talks to.
//!
//! A component is bound at construction to an identifier and a shared
//! reference to a backend offering the interface it needs. Components keep
//! no state of their own; everything lives in the backend, so they can be
//! created and dropped freely.

pub mod gpio_pin;
pub mod led;
pub mod power_output;
pub mod servo;
pub mod ultrasound;

pub use gpio_pin::GpioPin;
pub use led::Led;
pub use power_output::{PowerOutput, PowerOutputGroup};
pub use servo::Servo;
pub use ultrasound::UltrasoundSensor;

/// A component addressed by a single identifier on its board.
pub trait Component {
    /// Kind of component, for messages.
    const NAME: &'static str;

    /// Identifier of the component on its board.
    fn identifier(&self) -> u8;

    /// Kind and identifier, e.g. `servo 3`.
    fn describe(&self) -> String {
        format!("{} {}", Self::NAME, self.identifier())
    }
}
