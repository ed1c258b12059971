//! Dyncmd Bot Library
//!
//! This crate provides a chat bot command dispatcher whose command set
//! mixes builtin handlers with dynamic commands stored in SQLite and
//! edited at runtime from chat.

pub mod auth;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod store;
pub mod transport;
