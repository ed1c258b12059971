//! Error types for the bot.
//!
//! Provides a unified error handling system using thiserror.

mod types;

pub use types::*;
