//! Configuration Loader
//!
//! Layers built-in defaults, an optional YAML file and `BROKER__` environment
//! overrides, then validates the merged result.

use super::error::{ConfigResult, ConfigurationError};
use super::BrokerConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Environment variable prefix for overrides, e.g. `BROKER__FLEET__MAX_IN_FLIGHT=4`
pub const ENV_PREFIX: &str = "BROKER";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug)]
pub struct ConfigManager {
    config: BrokerConfig,
    /// YAML file the configuration was read from, if any
    source_file: Option<PathBuf>,
}

impl ConfigManager {
    /// Load defaults and environment overrides only
    pub fn load_from_env() -> ConfigResult<Arc<ConfigManager>> {
        let config = Self::build(None, None)?;
        Self::finish(config, None)
    }

    /// Load a YAML file on top of the defaults, then apply environment overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<Arc<ConfigManager>> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigurationError::config_file_not_found(vec![
                path.to_path_buf()
            ]));
        }

        let config = Self::build(Some(path), None)?;
        Self::finish(config, Some(path.to_path_buf()))
    }

    /// Wrap an already-built configuration after validating it
    pub fn from_config(config: BrokerConfig) -> ConfigResult<Arc<ConfigManager>> {
        Self::finish(config, None)
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    /// Sanitized configuration for debugging/logging with secrets masked
    pub fn debug_config(&self) -> serde_json::Value {
        Self::sanitize_config_for_logging(&self.config)
    }

    fn finish(config: BrokerConfig, source_file: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;

        debug!(
            "Configuration loaded successfully: {}",
            serde_json::to_string_pretty(&Self::sanitize_config_for_logging(&config))
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );

        info!(
            source = %source_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "defaults+env".to_string()),
            max_in_flight = config.fleet.max_in_flight,
            canary_count = config.fleet.canary_count,
            credential_store = config.credential_store.enabled,
            "🔧 CONFIG: Broker configuration loaded"
        );

        Ok(Arc::new(ConfigManager {
            config,
            source_file,
        }))
    }

    /// Merge sources into a `BrokerConfig`. `env_source` replaces the process
    /// environment, which keeps override tests independent of global state.
    pub(crate) fn build(
        path: Option<&Path>,
        env_source: Option<config::Map<String, String>>,
    ) -> ConfigResult<BrokerConfig> {
        let defaults = config::Config::try_from(&BrokerConfig::default())
            .map_err(|e| ConfigurationError::json_serialization_error("default configuration", e))?;

        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Yaml)
                    .required(true),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .source(env_source),
        );

        let source_name = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| format!("{ENV_PREFIX}{ENV_SEPARATOR}* environment"));

        let merged = builder.build().map_err(|e| match e {
            config::ConfigError::FileParse { .. } => {
                ConfigurationError::invalid_yaml(source_name.clone(), e)
            }
            other => ConfigurationError::load_error(source_name.clone(), other),
        })?;

        merged
            .try_deserialize::<BrokerConfig>()
            .map_err(|e| ConfigurationError::load_error(source_name, e))
    }

    /// Sanitize configuration for safe logging by masking sensitive fields
    fn sanitize_config_for_logging(config: &BrokerConfig) -> serde_json::Value {
        let mut config_json = serde_json::json!(config);
        let sensitive_patterns = ["password", "secret", "salt", "token", "credential_key"];
        Self::sanitize_json_recursive(&mut config_json, &sensitive_patterns);
        config_json
    }

    fn sanitize_json_recursive(value: &mut serde_json::Value, sensitive_patterns: &[&str]) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let key_lower = key.to_lowercase();
                    let is_sensitive = sensitive_patterns
                        .iter()
                        .any(|pattern| key_lower.contains(pattern));

                    if is_sensitive {
                        *val = match val {
                            serde_json::Value::String(s) if s.is_empty() => {
                                serde_json::Value::String("[EMPTY]".to_string())
                            }
                            _ => serde_json::Value::String("[MASKED]".to_string()),
                        };
                    } else {
                        Self::sanitize_json_recursive(val, sensitive_patterns);
                    }
                }
            }
            serde_json::Value::Array(items) => {
                for item in items.iter_mut() {
                    Self::sanitize_json_recursive(item, sensitive_patterns);
                }
            }
            _ => {}
        }
    }
}
