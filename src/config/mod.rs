//! Configuration module for the bot.
//!
//! Handles loading and validating bot configuration from TOML files.

mod settings;

pub use settings::*;
