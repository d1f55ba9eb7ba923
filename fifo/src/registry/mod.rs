// src/registry/mod.rs

//! A registry of independently named [`BoundedChannel`]s.
//!
//! Channels are created and destroyed on administrative command, either through
//! the typed [`Registry::create`] / [`Registry::remove`] API or through the text
//! commands parsed by [`AdminCommand`]. The registry only owns names: removing
//! a channel detaches it, and handles that are still open keep working until
//! they close.

mod admin;

pub use admin::{AdminCommand, AdminOutcome};

use crate::channel::BoundedChannel;
use crate::config::{ConfigError, RegistryConfig, MAX_CAPACITY};

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

/// Longest accepted channel name, in bytes.
pub const MAX_NAME_LEN: usize = 20;

#[derive(Debug, Error)]
pub enum RegistryError {
  #[error("registry full: at most {max_entries} channels may exist")]
  LimitReached { max_entries: usize },

  #[error("channel '{0}' already exists")]
  AlreadyExists(String),

  #[error("channel '{0}' does not exist")]
  NotFound(String),

  #[error("invalid channel name '{name}': {reason}")]
  InvalidName { name: String, reason: &'static str },

  #[error("channel capacity must be at least 1 byte")]
  ZeroCapacity,

  #[error("channel capacity {capacity} exceeds the maximum of {max} bytes")]
  CapacityTooLarge { capacity: usize, max: usize },

  #[error("unrecognized admin command: '{0}'")]
  InvalidCommand(String),

  #[error(transparent)]
  Config(#[from] ConfigError),
}

/// Validates a channel name, returning the reason it is rejected.
pub(crate) fn check_name(name: &str) -> Result<(), &'static str> {
  if name.is_empty() {
    Err("name is empty")
  } else if name.len() > MAX_NAME_LEN {
    Err("name is longer than 20 bytes")
  } else if name.chars().any(|c| c.is_whitespace() || c == '/') {
    Err("name contains whitespace or '/'")
  } else {
    Ok(())
  }
}

pub struct Registry {
  max_entries: usize,
  default_capacity: usize,
  channels: RwLock<BTreeMap<String, BoundedChannel>>,
}

impl fmt::Debug for Registry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Registry")
      .field("max_entries", &self.max_entries)
      .field("default_capacity", &self.default_capacity)
      .field("channels", &self.names())
      .finish()
  }
}

impl Default for Registry {
  /// A registry built from [`RegistryConfig::default`].
  fn default() -> Self {
    let config = RegistryConfig::default();
    Self::from_config(&config).unwrap_or_else(|err| {
      warn!(%err, "default registry configuration rejected, starting empty");
      Self::empty(&config)
    })
  }
}

impl Registry {
  /// Creates an empty registry.
  pub fn new(max_entries: usize, default_capacity: usize) -> Result<Self, RegistryError> {
    let config = RegistryConfig {
      max_entries,
      default_capacity,
      channels: Vec::new(),
    };
    Self::from_config(&config)
  }

  /// Builds a registry and its preset channels from a validated configuration.
  pub fn from_config(config: &RegistryConfig) -> Result<Self, RegistryError> {
    config.validate()?;
    let registry = Self::empty(config);
    for channel in &config.channels {
      registry.create(&channel.name, channel.capacity)?;
    }
    info!(
      max_entries = registry.max_entries,
      default_capacity = registry.default_capacity,
      presets = config.channels.len(),
      "fifo registry loaded"
    );
    Ok(registry)
  }

  fn empty(config: &RegistryConfig) -> Self {
    Self {
      max_entries: config.max_entries,
      default_capacity: config.default_capacity,
      channels: RwLock::new(BTreeMap::new()),
    }
  }

  /// Creates a channel named `name`. `None` uses the registry's default capacity.
  ///
  /// # Errors
  ///
  /// `LimitReached`, `AlreadyExists`, `InvalidName`, `ZeroCapacity` or
  /// `CapacityTooLarge` when `capacity` is above [`MAX_CAPACITY`].
  pub fn create(&self, name: &str, capacity: Option<usize>) -> Result<BoundedChannel, RegistryError> {
    check_name(name).map_err(|reason| RegistryError::InvalidName {
      name: name.to_string(),
      reason,
    })?;
    let capacity = capacity.unwrap_or(self.default_capacity);
    if capacity == 0 {
      return Err(RegistryError::ZeroCapacity);
    }
    if capacity > MAX_CAPACITY {
      return Err(RegistryError::CapacityTooLarge {
        capacity,
        max: MAX_CAPACITY,
      });
    }

    let mut channels = self.channels.write();
    if channels.len() >= self.max_entries {
      return Err(RegistryError::LimitReached {
        max_entries: self.max_entries,
      });
    }
    if channels.contains_key(name) {
      return Err(RegistryError::AlreadyExists(name.to_string()));
    }

    let channel = BoundedChannel::new(capacity);
    channels.insert(name.to_string(), channel.clone());
    info!(name, capacity, entries = channels.len(), "fifo channel created");
    Ok(channel)
  }

  /// Detaches the channel named `name` and returns it.
  pub fn remove(&self, name: &str) -> Result<BoundedChannel, RegistryError> {
    let mut channels = self.channels.write();
    let channel = channels
      .remove(name)
      .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
    let state = channel.state();
    info!(
      name,
      producers = state.producers,
      consumers = state.consumers,
      entries = channels.len(),
      "fifo channel removed"
    );
    Ok(channel)
  }

  /// Returns the channel named `name`, if it exists.
  pub fn get(&self, name: &str) -> Option<BoundedChannel> {
    self.channels.read().get(name).cloned()
  }

  pub fn contains(&self, name: &str) -> bool {
    self.channels.read().contains_key(name)
  }

  /// Names of all channels, in sorted order.
  pub fn names(&self) -> Vec<String> {
    self.channels.read().keys().cloned().collect()
  }

  pub fn len(&self) -> usize {
    self.channels.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn max_entries(&self) -> usize {
    self.max_entries
  }

  pub fn default_capacity(&self) -> usize {
    self.default_capacity
  }

  /// Parses and runs one administrative command.
  pub fn execute(&self, command: &str) -> Result<AdminOutcome, RegistryError> {
    let result = command
      .parse::<AdminCommand>()
      .and_then(|cmd| self.apply(cmd));
    if let Err(err) = &result {
      warn!(command = command.trim(), error = %err, "fifo admin command rejected");
    }
    result
  }

  /// Runs an already parsed administrative command.
  pub fn apply(&self, command: AdminCommand) -> Result<AdminOutcome, RegistryError> {
    match command {
      AdminCommand::New { name, capacity } => {
        let channel = self.create(&name, capacity)?;
        Ok(AdminOutcome::Created {
          name,
          capacity: channel.capacity(),
        })
      }
      AdminCommand::Delete { name } => {
        self.remove(&name)?;
        Ok(AdminOutcome::Removed { name })
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::channel::Role;
  use std::thread;

  #[test]
  fn default_registry_has_test_channel() {
    let registry = Registry::default();
    assert_eq!(registry.names(), vec!["test".to_string()]);
    assert_eq!(registry.get("test").unwrap().capacity(), 64);
    assert_eq!(registry.max_entries(), 5);
  }

  #[test]
  fn default_registry_matches_default_config() {
    let from_config = Registry::from_config(&RegistryConfig::default()).unwrap();
    let default = Registry::default();
    assert_eq!(default.names(), from_config.names());
    assert_eq!(default.max_entries(), from_config.max_entries());
    assert_eq!(default.default_capacity(), from_config.default_capacity());
  }

  #[test]
  fn create_get_remove() {
    let registry = Registry::new(3, 16).unwrap();
    assert!(registry.is_empty());

    let a = registry.create("a", None).unwrap();
    assert_eq!(a.capacity(), 16);
    let b = registry.create("b", Some(4)).unwrap();
    assert_eq!(b.capacity(), 4);

    assert!(registry.get("a").unwrap().same_channel(&a));
    assert_eq!(registry.names(), vec!["a".to_string(), "b".to_string()]);

    let removed = registry.remove("a").unwrap();
    assert!(removed.same_channel(&a));
    assert!(!registry.contains("a"));
    assert!(matches!(registry.remove("a"), Err(RegistryError::NotFound(_))));
  }

  #[test]
  fn enforces_limit_and_uniqueness() {
    let registry = Registry::new(1, 8).unwrap();
    registry.create("only", None).unwrap();
    assert!(matches!(
      registry.create("only", None),
      Err(RegistryError::LimitReached { max_entries: 1 })
    ));

    registry.remove("only").unwrap();
    registry.create("only", None).unwrap();

    let registry = Registry::new(2, 8).unwrap();
    registry.create("dup", None).unwrap();
    assert!(matches!(
      registry.create("dup", None),
      Err(RegistryError::AlreadyExists(_))
    ));
  }

  #[test]
  fn rejects_bad_names_and_capacities() {
    let registry = Registry::new(5, 8).unwrap();
    assert!(matches!(registry.create("", None), Err(RegistryError::InvalidName { .. })));
    assert!(matches!(
      registry.create("a/b", None),
      Err(RegistryError::InvalidName { .. })
    ));
    assert!(matches!(
      registry.create("this-name-is-far-too-long", None),
      Err(RegistryError::InvalidName { .. })
    ));
    assert!(matches!(registry.create("z", Some(0)), Err(RegistryError::ZeroCapacity)));
    assert!(matches!(
      registry.create("z", Some(MAX_CAPACITY + 1)),
      Err(RegistryError::CapacityTooLarge { max: MAX_CAPACITY, .. })
    ));
    assert!(registry.is_empty());
  }

  #[test]
  fn admin_command_with_huge_capacity_is_rejected() {
    let registry = Registry::new(2, 8).unwrap();
    assert!(matches!(
      registry.execute("new big 18446744073709551615"),
      Err(RegistryError::CapacityTooLarge {
        capacity: usize::MAX,
        max: MAX_CAPACITY
      })
    ));
    assert!(registry.is_empty());
    assert!(registry.execute("new big 16").is_ok());
  }

  #[test]
  fn zero_limits_are_rejected() {
    assert!(matches!(Registry::new(0, 8), Err(RegistryError::Config(_))));
    assert!(matches!(Registry::new(1, 0), Err(RegistryError::Config(_))));
  }

  #[test]
  fn execute_admin_commands() {
    let registry = Registry::new(2, 32).unwrap();
    assert_eq!(
      registry.execute("new pipe\n").unwrap(),
      AdminOutcome::Created {
        name: "pipe".to_string(),
        capacity: 32
      }
    );
    assert_eq!(
      registry.execute("new small 4").unwrap(),
      AdminOutcome::Created {
        name: "small".to_string(),
        capacity: 4
      }
    );
    assert!(matches!(
      registry.execute("new third"),
      Err(RegistryError::LimitReached { .. })
    ));
    assert_eq!(
      registry.execute("delete pipe").unwrap(),
      AdminOutcome::Removed {
        name: "pipe".to_string()
      }
    );
    assert!(matches!(
      registry.execute("delete pipe"),
      Err(RegistryError::NotFound(_))
    ));
    assert!(matches!(
      registry.execute("frobnicate"),
      Err(RegistryError::InvalidCommand(_))
    ));
  }

  #[test]
  fn removed_channel_keeps_serving_open_handles() {
    let registry = Registry::new(1, 8).unwrap();
    let channel = registry.create("live", None).unwrap();

    let opener = {
      let channel = channel.clone();
      thread::spawn(move || channel.open_consumer().unwrap())
    };
    let producer = channel.open(Role::Producer).unwrap().into_producer().unwrap();
    let consumer = opener.join().unwrap();

    registry.remove("live").unwrap();
    producer.send(b"still here").unwrap();
    assert_eq!(consumer.receive(10).unwrap(), b"still here");

    // The name is free again and refers to a fresh, unrelated channel.
    let fresh = registry.create("live", None).unwrap();
    assert!(!fresh.same_channel(&channel));
  }
}
