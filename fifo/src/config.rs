// src/config.rs

//! YAML configuration for a [`Registry`](crate::Registry).
//!
//! ```yaml
//! max_entries: 8
//! default_capacity: 64
//! channels:
//!   - name: test
//!   - name: telemetry
//!     capacity: 4096
//! ```
//!
//! Every field is optional. Without a `channels` list the registry starts with
//! a single channel named `test`.

use crate::registry::check_name;

use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_MAX_ENTRIES: usize = 5;
pub const DEFAULT_CAPACITY: usize = 64;
pub const DEFAULT_CHANNEL_NAME: &str = "test";
/// Largest capacity a channel may be created with (64 MiB).
pub const MAX_CAPACITY: usize = 1 << 26;

/// Errors raised while loading or validating a [`RegistryConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("Failed to read configuration file: {0}")]
  Read(#[from] io::Error),

  #[error("Failed to parse configuration: {0}")]
  Parse(#[from] serde_yaml::Error),

  #[error("Invalid configuration value for '{field}': {message}")]
  InvalidValue { field: String, message: String },
}

/// One channel created when the registry is built.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
  pub name: String,
  /// Falls back to `RegistryConfig::default_capacity`.
  #[serde(default)]
  pub capacity: Option<usize>,
}

impl ChannelConfig {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      capacity: None,
    }
  }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
  /// Maximum number of named channels that may exist at once.
  #[serde(default = "default_max_entries")]
  pub max_entries: usize,
  /// Capacity in bytes for channels created without an explicit one.
  #[serde(default = "default_capacity")]
  pub default_capacity: usize,
  /// Channels created up front.
  #[serde(default = "default_channels")]
  pub channels: Vec<ChannelConfig>,
}

fn default_max_entries() -> usize {
  DEFAULT_MAX_ENTRIES
}

fn default_capacity() -> usize {
  DEFAULT_CAPACITY
}

fn default_channels() -> Vec<ChannelConfig> {
  vec![ChannelConfig::new(DEFAULT_CHANNEL_NAME)]
}

impl Default for RegistryConfig {
  fn default() -> Self {
    Self {
      max_entries: default_max_entries(),
      default_capacity: default_capacity(),
      channels: default_channels(),
    }
  }
}

impl RegistryConfig {
  /// Parses and validates a configuration from YAML text.
  pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
    let config: RegistryConfig = serde_yaml::from_str(yaml)?;
    config.validate()?;
    Ok(config)
  }

  /// Reads, parses and validates a configuration file.
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let file = File::open(path.as_ref())?;
    let config: RegistryConfig = serde_yaml::from_reader(BufReader::new(file))?;
    config.validate()?;
    Ok(config)
  }

  /// Checks limits, capacities and preset names.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.max_entries == 0 {
      return Err(invalid("max_entries", "must be at least 1"));
    }
    if self.default_capacity == 0 {
      return Err(invalid("default_capacity", "must be at least 1 byte"));
    }
    if self.default_capacity > MAX_CAPACITY {
      return Err(invalid(
        "default_capacity",
        format!("{} exceeds the maximum of {} bytes", self.default_capacity, MAX_CAPACITY),
      ));
    }
    if self.channels.len() > self.max_entries {
      return Err(invalid(
        "channels",
        format!(
          "{} channels listed but max_entries is {}",
          self.channels.len(),
          self.max_entries
        ),
      ));
    }

    let mut seen = HashSet::new();
    for channel in &self.channels {
      check_name(&channel.name).map_err(|reason| {
        invalid("channels.name", format!("'{}': {}", channel.name, reason))
      })?;
      if !seen.insert(channel.name.as_str()) {
        return Err(invalid(
          "channels.name",
          format!("'{}' is listed more than once", channel.name),
        ));
      }
      if channel.capacity == Some(0) {
        return Err(invalid(
          "channels.capacity",
          format!("'{}' must have a capacity of at least 1 byte", channel.name),
        ));
      }
      if let Some(capacity) = channel.capacity.filter(|&c| c > MAX_CAPACITY) {
        return Err(invalid(
          "channels.capacity",
          format!(
            "'{}' asks for {} bytes, more than the maximum of {}",
            channel.name, capacity, MAX_CAPACITY
          ),
        ));
      }
    }
    Ok(())
  }

  /// The capacity a preset channel will be created with.
  pub fn capacity_for(&self, channel: &ChannelConfig) -> usize {
    channel.capacity.unwrap_or(self.default_capacity)
  }
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
  ConfigError::InvalidValue {
    field: field.to_string(),
    message: message.into(),
  }
}
