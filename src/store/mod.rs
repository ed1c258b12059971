//! Command store module.
//!
//! Durable storage for dynamic command definitions. The store owns the
//! table schema and the one-time migration of the legacy table.

mod model;
mod sqlite;
mod traits;

pub use model::{parse_bool, parse_bool_lenient, CommandField, CommandRow};
pub use sqlite::{SqliteCommandStore, COMMANDS_TABLE, LEGACY_COMMANDS_TABLE};
pub use traits::CommandStore;
