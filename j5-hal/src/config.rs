//! Configuration for backends and board discovery.
//!
//! Every value has a default that works with stock SBDuino firmware. The
//! structures deserialize with serde so they can be embedded in a larger
//! application config, and `from_env()` applies `J5_*` environment
//! variable overrides on top of the defaults.

use serde::{Deserialize, Serialize};
use std::{env, str::FromStr, time::Duration};
use strum::{Display, EnumString};

use crate::error::{Error, Result};

/// Default baud rate of the SBDuino firmware.
pub const DEFAULT_BAUD: u32 = 115_200;

/// Default bound on every blocking serial read.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1250);

/// Default number of empty reads tolerated while waiting for the banner.
pub const DEFAULT_BOOT_ATTEMPTS: u32 = 25;

/// Serial backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Baud rate used to open the port
    pub baud: u32,

    /// Timeout for opening the port and for each response line, in
    /// milliseconds
    pub timeout_ms: u64,

    /// Empty reads allowed before the board is declared unresponsive
    pub boot_attempts: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            baud: DEFAULT_BAUD,
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            boot_attempts: DEFAULT_BOOT_ATTEMPTS,
        }
    }
}

impl BackendConfig {
    /// Defaults overridden by `J5_SERIAL_BAUD`, `J5_SERIAL_TIMEOUT_MS` and
    /// `J5_BOOT_ATTEMPTS`.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            baud: env_or("J5_SERIAL_BAUD", defaults.baud)?,
            timeout_ms: env_or("J5_SERIAL_TIMEOUT_MS", defaults.timeout_ms)?,
            boot_attempts: env_or("J5_BOOT_ATTEMPTS", defaults.boot_attempts)?,
        })
    }

    /// The configured timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// What discovery does when one matching port fails to connect.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FailurePolicy {
    /// Log the failure and keep discovering the remaining ports.
    #[default]
    Skip,
    /// Stop and return the first failure.
    Abort,
}

/// Board discovery configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Configuration handed to every backend discovery creates
    pub backend: BackendConfig,

    /// Handling of ports that fail to connect
    pub failure_policy: FailurePolicy,

    /// Connect to all candidate ports concurrently
    pub parallel: bool,
}

impl DiscoveryConfig {
    /// Defaults overridden by the backend variables plus
    /// `J5_DISCOVERY_FAILURE_POLICY` (`skip` or `abort`) and
    /// `J5_DISCOVERY_PARALLEL`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            backend: BackendConfig::from_env()?,
            failure_policy: env_or("J5_DISCOVERY_FAILURE_POLICY", FailurePolicy::default())?,
            parallel: env_or("J5_DISCOVERY_PARALLEL", false)?,
        })
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("invalid value {value:?} for {name}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_defaults() {
        let config = BackendConfig::default();
        assert_eq!(config.baud, 115_200);
        assert_eq!(config.timeout(), Duration::from_millis(1250));
        assert_eq!(config.boot_attempts, 25);
    }

    #[test]
    fn test_failure_policy_parse() {
        assert_eq!("skip".parse::<FailurePolicy>().unwrap(), FailurePolicy::Skip);
        assert_eq!("Abort".parse::<FailurePolicy>().unwrap(), FailurePolicy::Abort);
        assert!("retry".parse::<FailurePolicy>().is_err());
        assert_eq!(FailurePolicy::Abort.to_string(), "abort");
    }

    #[test]
    fn test_env_or_rejects_garbage() {
        // Variable name unique to this test so parallel tests don't interfere.
        env::set_var("J5_TEST_ENV_OR_GARBAGE", "not-a-number");
        let result: Result<u32> = env_or("J5_TEST_ENV_OR_GARBAGE", 7);
        assert!(matches!(result, Err(Error::Config(_))));
        env::remove_var("J5_TEST_ENV_OR_GARBAGE");

        let result: Result<u32> = env_or("J5_TEST_ENV_OR_UNSET", 7);
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: DiscoveryConfig =
            serde_json::from_str(r#"{"failure_policy": "abort", "backend": {"timeout_ms": 500}}"#)
                .unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert_eq!(config.backend.timeout(), Duration::from_millis(500));
        assert_eq!(config.backend.baud, DEFAULT_BAUD);
        assert!(!config.parallel);
    }
}
