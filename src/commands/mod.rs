//! Command handlers module.
//!
//! Contains the command registry, the builtin commands, and the
//! rendering of dynamic commands.
//!
//! ## Adding a New Builtin
//!
//! 1. Create a new file in `builtin/`
//! 2. Implement the `Command` trait
//! 3. Add it to `CommandRegistry::default_builtins()`

mod definition;
mod dynamic;
mod registry;
mod traits;
mod types;

pub mod builtin;

pub use definition::{normalize_name, CommandDefinition, CommandKind, CommandPayload};
pub use dynamic::DYNAMIC_COLOR;
pub use registry::{CommandHandler, CommandMap, CommandRegistry, RegisteredCommand};
pub use traits::Command;
pub use types::{CommandArgs, ExecutionContext, Switches};
