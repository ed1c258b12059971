//! Message dispatch module.
//!
//! Turns inbound chat messages into command invocations and runs them
//! off the event loop.

mod dispatcher;
mod parser;

pub use dispatcher::{execute, Dispatcher, PreparedInvocation};
pub use parser::{command_name, parse_arguments, tokenize};
