//! # Broker Configuration System
//!
//! Typed configuration for the broker orchestration layer, layered from built-in
//! defaults, an optional YAML file and `BROKER__`-prefixed environment overrides.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use service_broker::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load_from_file("config/broker.yaml")?;
//!
//! let max_in_flight = manager.config().fleet.max_in_flight;
//! let poll_interval = manager.config().polling.poll_interval();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::fleet::FleetConfig;
use crate::resilience::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring broker.yaml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Identity and request-handling settings
    pub broker: BrokerSettings,

    /// LastOperation polling cadence used by fleet rollouts
    pub polling: PollingConfig,

    /// Bulk upgrade/recreate bounds
    pub fleet: FleetConfig,

    /// Binding credential persistence
    pub credential_store: CredentialStoreConfig,

    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSettings {
    /// Service offering this broker serves; part of every credential storage key
    pub service_id: String,
    /// Backend deployment name is this prefix followed by the instance ID
    pub deployment_name_prefix: String,
    /// Mixed into derived binding credentials
    pub credential_salt: String,
    /// Reject lifecycle requests whose client cannot handle asynchronous responses
    pub require_async: bool,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            service_id: String::new(),
            deployment_name_prefix: "service-instance_".to_string(),
            credential_salt: String::new(),
            require_async: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub poll_interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5000,
        }
    }
}

impl PollingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Whether a Bind response waits for the credential store write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialWriteMode {
    /// Write in the background; failures are logged
    #[default]
    BestEffort,
    /// Write before responding; failures fail the bind
    Blocking,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialStoreConfig {
    pub enabled: bool,
    /// First delay while the store's DNS name is unresolvable; doubles per retry
    pub initial_retry_delay_ms: u64,
    pub max_retries: u32,
    pub write_mode: CredentialWriteMode,
}

impl Default for CredentialStoreConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            initial_retry_delay_ms: 500,
            max_retries: 6,
            write_mode: CredentialWriteMode::BestEffort,
        }
    }
}

impl CredentialStoreConfig {
    pub fn initial_retry_delay(&self) -> Duration {
        Duration::from_millis(self.initial_retry_delay_ms)
    }

    /// Startup retry policy while the store's name does not resolve
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(self.initial_retry_delay(), self.max_retries)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl BrokerConfig {
    /// Validate configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.broker.deployment_name_prefix.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "broker.deployment_name_prefix",
                "broker configuration",
            ));
        }

        if self.polling.poll_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "polling.poll_interval_ms",
                "0",
                "poll interval must be greater than 0",
            ));
        }

        self.fleet.validate()?;

        if self.credential_store.enabled {
            if self.broker.service_id.is_empty() {
                return Err(ConfigurationError::missing_required_field(
                    "broker.service_id",
                    "credential store storage keys",
                ));
            }

            if self.credential_store.max_retries == 0 {
                return Err(ConfigurationError::invalid_value(
                    "credential_store.max_retries",
                    "0",
                    "an enabled credential store needs at least one connection retry",
                ));
            }
        }

        Ok(())
    }
}
