//! Row model and the allow-list of mutable command fields.

use std::fmt;
use std::str::FromStr;

use crate::commands::{normalize_name, CommandDefinition, CommandKind, CommandPayload};
use crate::error::{BotError, ValidationErrorKind};

/// Fields of a stored command that may be changed after creation.
///
/// The command name is the primary key and cannot be changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandField {
    HelpText,
    Category,
    Admin,
    Title,
    Body,
    ImageUrl,
}

impl CommandField {
    /// All mutable fields.
    pub const ALL: [CommandField; 6] = [
        CommandField::HelpText,
        CommandField::Category,
        CommandField::Admin,
        CommandField::Title,
        CommandField::Body,
        CommandField::ImageUrl,
    ];

    /// Column name in the commands table.
    pub fn column(&self) -> &'static str {
        match self {
            CommandField::HelpText => "helpText",
            CommandField::Category => "category",
            CommandField::Admin => "admin",
            CommandField::Title => "title",
            CommandField::Body => "body",
            CommandField::ImageUrl => "imageUrl",
        }
    }

    /// Parameterized update statement for this field.
    pub(crate) fn update_statement(&self) -> &'static str {
        match self {
            CommandField::HelpText => "UPDATE commands_v2 SET helpText = ? WHERE name = ?",
            CommandField::Category => "UPDATE commands_v2 SET category = ? WHERE name = ?",
            CommandField::Admin => "UPDATE commands_v2 SET admin = ? WHERE name = ?",
            CommandField::Title => "UPDATE commands_v2 SET title = ? WHERE name = ?",
            CommandField::Body => "UPDATE commands_v2 SET body = ? WHERE name = ?",
            CommandField::ImageUrl => "UPDATE commands_v2 SET imageUrl = ? WHERE name = ?",
        }
    }
}

impl fmt::Display for CommandField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for CommandField {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommandField::ALL
            .into_iter()
            .find(|field| field.column().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                BotError::validation(ValidationErrorKind::UnknownField {
                    field: s.to_string(),
                })
            })
    }
}

/// Parse a boolean written by a human or by an older schema.
///
/// Accepts true/false, yes/no and 1/0 in any casing.
pub fn parse_bool(value: &str) -> Option<bool> {
    let value = value.trim();
    if ["true", "yes", "1"]
        .iter()
        .any(|t| value.eq_ignore_ascii_case(t))
    {
        Some(true)
    } else if ["false", "no", "0", ""]
        .iter()
        .any(|f| value.eq_ignore_ascii_case(f))
    {
        Some(false)
    } else {
        None
    }
}

/// Like [`parse_bool`], but anything unrecognized reads as `false`.
pub fn parse_bool_lenient(value: &str) -> bool {
    parse_bool(value).unwrap_or(false)
}

/// A raw row of the commands table, every column read as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandRow {
    pub name: Option<String>,
    pub help_text: Option<String>,
    pub category: Option<String>,
    pub admin: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub image_url: Option<String>,
}

impl CommandRow {
    /// Decode the row into a dynamic command definition.
    pub fn into_definition(self) -> Result<CommandDefinition, BotError> {
        let raw_name = self.name.unwrap_or_default();
        let name = normalize_name(&raw_name)?;

        let requires_admin = match self.admin.as_deref() {
            None => false,
            Some(value) => parse_bool(value).ok_or_else(|| {
                BotError::validation(ValidationErrorKind::InvalidValue {
                    field: CommandField::Admin.column().to_string(),
                    value: value.to_string(),
                })
            })?,
        };

        Ok(CommandDefinition {
            name,
            kind: CommandKind::Dynamic,
            requires_admin,
            help_text: self.help_text.unwrap_or_default(),
            category: self.category.filter(|c| !c.trim().is_empty()),
            payload: CommandPayload {
                title: self.title,
                body: self.body,
                image_url: self.image_url,
            },
        })
    }
}
