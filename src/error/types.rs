//! Error types for the bot.

use thiserror::Error;

/// Main error type for the bot.
#[derive(Error, Debug)]
pub enum BotError {
    /// Configuration-related errors.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Chat transport errors (send/receive).
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Command store errors.
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Validation errors.
    #[error("Validation error: {kind}")]
    Validation { kind: ValidationErrorKind },

    /// Command execution errors.
    #[error("Command error: {kind}")]
    Command { kind: CommandErrorKind },

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validation error kinds.
#[derive(Error, Debug)]
pub enum ValidationErrorKind {
    #[error("Unknown command field: {field}")]
    UnknownField { field: String },

    #[error("'{name}' is a builtin command and cannot be redefined")]
    BuiltinCollision { name: String },

    #[error("Invalid command name: '{name}'")]
    InvalidName { name: String },

    #[error("Invalid value '{value}' for field '{field}'")]
    InvalidValue { field: String, value: String },
}

/// Command error kinds.
#[derive(Error, Debug)]
pub enum CommandErrorKind {
    #[error("Unknown command: {name}")]
    NotFound { name: String },

    #[error("Command '{command}' requires admin privileges")]
    PermissionDenied { command: String },

    #[error("Command timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    #[error("Command execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("Change to '{name}' was saved but the registry was not rebuilt")]
    ReloadPending { name: String },
}

impl BotError {
    /// Shorthand for a validation error.
    pub fn validation(kind: ValidationErrorKind) -> Self {
        Self::Validation { kind }
    }

    /// Shorthand for a command error.
    pub fn command(kind: CommandErrorKind) -> Self {
        Self::Command { kind }
    }

    /// Whether this error came from the command store.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Text that is safe to show in a chat channel.
    ///
    /// Validation and command errors are specific. Storage and internal
    /// failures are reported generically so no driver text leaks.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { kind } => format!(":x: {}", kind),
            Self::Command {
                kind: CommandErrorKind::PermissionDenied { .. },
            } => ":no_entry: You do not have permission to use this command.".to_string(),
            Self::Command {
                kind: CommandErrorKind::Timeout { .. },
            } => ":hourglass: That command took too long to answer. A change it already started still completes.".to_string(),
            Self::Command {
                kind: CommandErrorKind::NotFound { name },
            } => format!(":warning: No command found with name '{}'", name),
            Self::Command {
                kind: CommandErrorKind::ExecutionFailed { .. },
            } => ":warning: Something went wrong while running that command.".to_string(),
            Self::Command {
                kind: CommandErrorKind::ReloadPending { name },
            } => format!(
                ":warning: Saved the change to '{}', but the command list could not be reloaded yet. Run reload to retry.",
                name
            ),
            Self::Storage(_) => {
                ":warning: The command database is unavailable right now, nothing was changed."
                    .to_string()
            }
            Self::Config { .. } | Self::Transport { .. } | Self::Io(_) => {
                ":warning: Something went wrong while running that command.".to_string()
            }
        }
    }
}

/// Result type alias for bot operations.
pub type BotResult<T> = Result<T, BotError>;
