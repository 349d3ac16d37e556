//! Switchable power output channels.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::Component;
use crate::error::Result;
use crate::hw_trait::PowerOutputInterface;

/// A power output channel.
///
/// It can be enabled and disabled, and the current drawn through it can be
/// measured.
pub struct PowerOutput<B: PowerOutputInterface + ?Sized> {
    identifier: u8,
    backend: Arc<B>,
}

impl<B: PowerOutputInterface + ?Sized> Component for PowerOutput<B> {
    const NAME: &'static str = "power output";

    fn identifier(&self) -> u8 {
        self.identifier
    }
}

impl<B: PowerOutputInterface + ?Sized> PowerOutput<B> {
    pub fn new(identifier: u8, backend: Arc<B>) -> Self {
        Self {
            identifier,
            backend,
        }
    }

    pub fn is_enabled(&self) -> Result<bool> {
        self.backend.get_power_output_enabled(self.identifier)
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.backend.set_power_output_enabled(self.identifier, enabled)
    }

    /// Current drawn through this output, in amperes.
    pub fn current(&self) -> Result<f64> {
        self.backend.get_power_output_current(self.identifier)
    }
}

/// A named set of power outputs switched together.
pub struct PowerOutputGroup<K: Ord, B: PowerOutputInterface + ?Sized> {
    outputs: BTreeMap<K, PowerOutput<B>>,
}

impl<K: Ord, B: PowerOutputInterface + ?Sized> PowerOutputGroup<K, B> {
    pub fn new(outputs: BTreeMap<K, PowerOutput<B>>) -> Self {
        Self { outputs }
    }

    /// Enable every output. Stops at the first failure.
    pub fn power_on(&self) -> Result<()> {
        self.outputs.values().try_for_each(|output| output.set_enabled(true))
    }

    /// Disable every output. Stops at the first failure.
    pub fn power_off(&self) -> Result<()> {
        self.outputs.values().try_for_each(|output| output.set_enabled(false))
    }

    pub fn get(&self, key: &K) -> Option<&PowerOutput<B>> {
        self.outputs.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &PowerOutput<B>)> {
        self.outputs.iter()
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}
