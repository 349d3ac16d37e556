//! Power output hardware abstraction trait.

use crate::error::Result;

/// Switchable power output channel abstraction
pub trait PowerOutputInterface: Send + Sync {
    /// Get whether a power output is enabled.
    fn get_power_output_enabled(&self, identifier: u8) -> Result<bool>;

    /// Enable or disable a power output.
    fn set_power_output_enabled(&self, identifier: u8, enabled: bool) -> Result<()>;

    /// Get the current drawn on a power output, in amperes.
    fn get_power_output_current(&self, identifier: u8) -> Result<f64>;
}
