//! Command definitions shared by the registry and the command store.

use crate::error::{BotError, ValidationErrorKind};

/// Where a command comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Constructed in code at startup, never persisted.
    Builtin,
    /// Stored as a row in the command store.
    Dynamic,
}

/// Reply content of a dynamic command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub image_url: Option<String>,
}

impl CommandPayload {
    /// Whether the payload would render as an empty message.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none() && self.image_url.is_none()
    }
}

/// A single invocable command, as indexed by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDefinition {
    /// Lowercase dispatch key, also the store primary key.
    pub name: String,
    pub kind: CommandKind,
    pub requires_admin: bool,
    pub help_text: String,
    /// Grouping label, dynamic commands only.
    pub category: Option<String>,
    pub payload: CommandPayload,
}

impl CommandDefinition {
    /// A blank dynamic command with default fields.
    pub fn dynamic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: CommandKind::Dynamic,
            requires_admin: false,
            help_text: String::new(),
            category: None,
            payload: CommandPayload::default(),
        }
    }

    /// Definition describing a builtin handler.
    pub fn builtin(name: &str, help_text: &str, requires_admin: bool) -> Self {
        Self {
            name: name.to_string(),
            kind: CommandKind::Builtin,
            requires_admin,
            help_text: help_text.to_string(),
            category: None,
            payload: CommandPayload::default(),
        }
    }

    pub fn is_builtin(&self) -> bool {
        self.kind == CommandKind::Builtin
    }

    pub fn is_dynamic(&self) -> bool {
        self.kind == CommandKind::Dynamic
    }
}

/// Normalize a raw command name into its dispatch key.
///
/// Names are case-insensitive and must be a single non-empty token.
pub fn normalize_name(raw: &str) -> Result<String, BotError> {
    let name = raw.trim().to_lowercase();
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(BotError::validation(ValidationErrorKind::InvalidName {
            name: raw.to_string(),
        }));
    }
    Ok(name)
}
