//! Configuration settings for the bot.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::BotError;

/// Main configuration structure for the bot.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
}

/// Command surface configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Token that must start the first word of a message for it to be a command.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Sender ids that are always treated as admins.
    #[serde(default)]
    pub superusers: Vec<String>,
}

/// Command store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
    /// Connection pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// How long a statement waits on a locked database.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_seconds: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format ("pretty" or "json").
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Handler execution limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Default handler timeout in seconds.
    #[serde(default = "default_handler_timeout")]
    pub handler_timeout_seconds: u64,
    /// Maximum handlers running at the same time.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_handlers: usize,
}

/// Console transport configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleConfig {
    /// Channel id attributed to plain-text console input.
    #[serde(default = "default_console_channel")]
    pub channel: String,
    /// Sender id attributed to plain-text console input.
    #[serde(default = "default_console_user_id")]
    pub user_id: String,
    /// Display name attributed to plain-text console input.
    #[serde(default = "default_console_user_name")]
    pub user_name: String,
    /// Whether plain-text console input runs with admin rights.
    #[serde(default = "default_console_admin")]
    pub admin: bool,
}

// Default value functions
fn default_prefix() -> String {
    ">".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("hifumi-commands.db")
}

fn default_max_connections() -> u32 {
    4
}

fn default_busy_timeout() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_handler_timeout() -> u64 {
    30
}

fn default_max_concurrent() -> usize {
    16
}

fn default_console_channel() -> String {
    "console".to_string()
}

fn default_console_user_id() -> String {
    "console".to_string()
}

fn default_console_user_name() -> String {
    "Console".to_string()
}

fn default_console_admin() -> bool {
    true
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            superusers: Vec::new(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
            busy_timeout_seconds: default_busy_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            handler_timeout_seconds: default_handler_timeout(),
            max_concurrent_handlers: default_max_concurrent(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            channel: default_console_channel(),
            user_id: default_console_user_id(),
            user_name: default_console_user_name(),
            admin: default_console_admin(),
        }
    }
}

impl LimitsConfig {
    /// Default handler timeout as a duration.
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_secs(self.handler_timeout_seconds)
    }
}

impl Settings {
    /// Load settings from a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, BotError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| BotError::Config {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        let settings = Self::from_toml(&content).map_err(|e| match e {
            BotError::Config { message } => BotError::Config {
                message: format!("{} ('{}')", message, path.display()),
            },
            other => other,
        })?;

        Ok(settings)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, BotError> {
        let settings: Settings = toml::from_str(content).map_err(|e| BotError::Config {
            message: format!("Failed to parse config: {}", e),
        })?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate the settings.
    fn validate(&self) -> Result<(), BotError> {
        if self.bot.prefix.is_empty() || self.bot.prefix.chars().any(char::is_whitespace) {
            return Err(BotError::Config {
                message: format!(
                    "Invalid command prefix '{}'. Must be non-empty without whitespace",
                    self.bot.prefix
                ),
            });
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(BotError::Config {
                message: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        // Validate log format
        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(BotError::Config {
                message: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        if self.database.max_connections == 0 {
            return Err(BotError::Config {
                message: "database.max_connections must be at least 1".to_string(),
            });
        }

        if self.limits.max_concurrent_handlers == 0 {
            return Err(BotError::Config {
                message: "limits.max_concurrent_handlers must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}
