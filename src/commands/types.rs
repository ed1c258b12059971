//! Command types: arguments, switches, and execution context.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::transport::Sender;

use super::registry::CommandRegistry;

/// Named `-x`/`--xxx` values parsed from a command line.
///
/// Keeps the order in which switches were first given; a repeated
/// switch overwrites the earlier value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Switches {
    entries: Vec<(String, String)>,
}

impl Switches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a switch value, replacing any earlier one with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Switches {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut switches = Switches::new();
        for (name, value) in iter {
            switches.insert(name, value);
        }
        switches
    }
}

/// Arguments handed to a command handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandArgs {
    /// Tokens after the command name that are not switches or switch values.
    pub positional: Vec<String>,
    pub switches: Switches,
}

impl CommandArgs {
    pub fn positional(&self, index: usize) -> Option<&str> {
        self.positional.get(index).map(String::as_str)
    }
}

/// Execution context for a command.
///
/// Carries request metadata plus the registry, so handlers reach shared
/// state through the context instead of a global.
#[derive(Clone)]
pub struct ExecutionContext {
    /// Unique identifier for this invocation.
    pub request_id: Uuid,
    /// Channel the reply goes to.
    pub channel: String,
    /// Member that sent the message, if any.
    pub sender: Option<Sender>,
    /// Whether the sender has admin rights.
    pub is_admin: bool,
    /// When the message was received.
    pub received_at: DateTime<Utc>,
    /// The normalized command name.
    pub command: String,
    /// Configured command prefix, for usage texts.
    pub prefix: String,
    pub registry: Arc<CommandRegistry>,
}

impl ExecutionContext {
    /// Display name of the sender, or a placeholder.
    pub fn sender_name(&self) -> &str {
        self.sender
            .as_ref()
            .map(|s| s.name.as_str())
            .unwrap_or("unknown user")
    }
}
