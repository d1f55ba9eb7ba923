// src/registry/admin.rs

//! The administrative command language understood by [`Registry::execute`](super::Registry::execute).
//!
//! ```text
//! new <name> [capacity]
//! delete <name>
//! ```
//!
//! Surrounding whitespace (including the trailing newline of `echo`) is ignored.

use super::RegistryError;

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
  /// Create a channel; `capacity` falls back to the registry default.
  New { name: String, capacity: Option<usize> },
  /// Remove a channel.
  Delete { name: String },
}

impl FromStr for AdminCommand {
  type Err = RegistryError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || RegistryError::InvalidCommand(s.trim().to_string());
    let words: Vec<&str> = s.split_whitespace().collect();

    match words.as_slice() {
      ["new", name] => Ok(AdminCommand::New {
        name: (*name).to_string(),
        capacity: None,
      }),
      ["new", name, capacity] => {
        let capacity = capacity.parse::<usize>().map_err(|_| invalid())?;
        Ok(AdminCommand::New {
          name: (*name).to_string(),
          capacity: Some(capacity),
        })
      }
      ["delete", name] => Ok(AdminCommand::Delete {
        name: (*name).to_string(),
      }),
      _ => Err(invalid()),
    }
  }
}

impl fmt::Display for AdminCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AdminCommand::New {
        name,
        capacity: Some(capacity),
      } => write!(f, "new {} {}", name, capacity),
      AdminCommand::New { name, capacity: None } => write!(f, "new {}", name),
      AdminCommand::Delete { name } => write!(f, "delete {}", name),
    }
  }
}

/// What a successfully executed [`AdminCommand`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminOutcome {
  Created { name: String, capacity: usize },
  Removed { name: String },
}
