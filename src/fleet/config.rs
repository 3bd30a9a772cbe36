use crate::config::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rollout bounds for one fleet run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Instances processed first; any canary failure halts the run
    pub canary_count: usize,
    /// Upper bound on instances triggered but not yet terminal
    pub max_in_flight: usize,
    /// Wait between attempts on the same instance after a transient failure
    pub attempt_interval_seconds: u64,
    /// Attempts per instance, including the first
    pub max_attempts: u32,
    /// Deadline for the whole run
    pub total_timeout_seconds: u64,
    /// Deadline for one trigger-and-poll sequence
    pub instance_timeout_seconds: u64,
    /// How long in-flight instances keep polling after the run is stopped
    pub cancellation_grace_seconds: u64,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            canary_count: 1,
            max_in_flight: 1,
            attempt_interval_seconds: 60,
            max_attempts: 5,
            total_timeout_seconds: 7200,
            instance_timeout_seconds: 1800,
            cancellation_grace_seconds: 300,
        }
    }
}

impl FleetConfig {
    pub fn attempt_interval(&self) -> Duration {
        Duration::from_secs(self.attempt_interval_seconds)
    }

    pub fn total_timeout(&self) -> Duration {
        Duration::from_secs(self.total_timeout_seconds)
    }

    pub fn instance_timeout(&self) -> Duration {
        Duration::from_secs(self.instance_timeout_seconds)
    }

    pub fn cancellation_grace(&self) -> Duration {
        Duration::from_secs(self.cancellation_grace_seconds)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_in_flight == 0 {
            return Err(ConfigurationError::invalid_value(
                "fleet.max_in_flight",
                "0",
                "at least one instance must be allowed in flight",
            ));
        }

        if self.max_attempts == 0 {
            return Err(ConfigurationError::invalid_value(
                "fleet.max_attempts",
                "0",
                "every instance needs at least one attempt",
            ));
        }

        if self.total_timeout_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "fleet.total_timeout_seconds",
                "0",
                "total timeout must be greater than 0",
            ));
        }

        if self.instance_timeout_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "fleet.instance_timeout_seconds",
                "0",
                "instance timeout must be greater than 0",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = FleetConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.attempt_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_zero_in_flight_is_rejected() {
        let config = FleetConfig {
            max_in_flight: 0,
            ..FleetConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("fleet.max_in_flight"));
    }

    #[test]
    fn test_zero_attempts_is_rejected() {
        let config = FleetConfig {
            max_attempts: 0,
            ..FleetConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
