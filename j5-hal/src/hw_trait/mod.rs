//! Hardware abstraction layer traits.
//!
//! This module defines the capability contracts (GPIO, LED, power output,
//! servo, ultrasound) that a backend implements to drive a board. Each
//! contract is small; a concrete backend implements the set that matches
//! its hardware and firmware, and components only ask for the one they need.
//!
//! All methods take `&self`. Backends serialize access to their hardware
//! internally, so a single backend can be shared between components and
//! threads behind an `Arc`.

pub mod gpio;
pub mod led;
pub mod power_output;
pub mod servo;
pub mod ultrasound;

// Re-export traits
pub use gpio::{FirmwareModes, GpioPinInterface, GpioPinMode, PinModes};
pub use led::LedInterface;
pub use power_output::PowerOutputInterface;
pub use servo::{ServoInterface, ServoPosition};
pub use ultrasound::{Distance, Echo, UltrasoundInterface};
