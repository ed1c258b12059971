//! Builtin commands.

mod dyncmd;
mod help;
mod ping;
mod reload;

pub use dyncmd::DynCmdCommand;
pub use help::HelpCommand;
pub use ping::PingCommand;
pub use reload::ReloadCommand;

/// Category label under which builtins are listed.
pub const BUILTIN_CATEGORY: &str = "builtin";
