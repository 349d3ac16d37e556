//! Hardware abstraction layer for robotics boards.
//!
//! Robot programs talk to components ([`components::GpioPin`],
//! [`components::Led`], [`components::Servo`],
//! [`components::UltrasoundSensor`]) handed out by a [`board::Board`].
//! Components forward every operation to a backend implementing the
//! capability traits in [`hw_trait`]. The only backend shipped is
//! [`arduino::ArduinoBackend`], which drives an Arduino Uno running the
//! SBDuino GPIO firmware over a serial line.
//!
//! Boards are usually found with [`discovery::discover_system`].

pub mod arduino;
pub mod board;
pub mod components;
pub mod config;
pub mod discovery;
pub mod error;
pub mod hw_trait;
pub mod tracing;
pub mod transport;

pub use board::{ArduinoUno, Board, BoardInfo};
pub use config::{BackendConfig, DiscoveryConfig, FailurePolicy};
pub use discovery::{discover, discover_system, BoardSet};
pub use error::{Error, Result};
