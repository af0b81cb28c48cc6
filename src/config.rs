//! Configuration for the type registry
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (type-registry.toml)
//! - Environment variables (TYPE_REGISTRY__*)
//!
//! ## Example config file (type-registry.toml):
//! ```toml
//! [store]
//! shard_amount = 32
//! initial_capacity = 256
//!
//! [logging]
//! filter = "type_registry=debug"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for the type registry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Store sizing
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging settings for the binaries
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Sizing of each sharded store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Number of lock shards per store (power of two, greater than 1)
    #[serde(default = "default_shard_amount")]
    pub shard_amount: usize,

    /// Entries preallocated per store
    #[serde(default)]
    pub initial_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when RUST_LOG is unset
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_shard_amount() -> usize {
    16
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            shard_amount: default_shard_amount(),
            initial_capacity: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shard_amount <= 1 || !self.shard_amount.is_power_of_two() {
            return Err(ConfigError::Message(format!(
                "store.shard_amount must be a power of two greater than 1, got {}",
                self.shard_amount
            )));
        }
        Ok(())
    }
}

impl RegistryConfig {
    /// Load configuration from the default locations, plus `config_path` when given
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "type-registry.toml",
            ".type-registry.toml",
            "config/type-registry.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "catalog", "type-registry") {
            let xdg_config = config_dir.config_dir().join("type-registry.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("TYPE_REGISTRY")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.store.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> crate::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
