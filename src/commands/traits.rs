//! Command trait definition.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::BotResult;
use crate::transport::Reply;

use super::definition::CommandDefinition;
use super::types::{CommandArgs, ExecutionContext};

/// Core trait for builtin commands.
///
/// Builtins are constructed in code and registered when the registry is
/// built. Dynamic commands do not implement this trait; they are rows
/// rendered by the registry.
///
/// # Example
///
/// ```ignore
/// pub struct EchoCommand;
///
/// #[async_trait]
/// impl Command for EchoCommand {
///     fn name(&self) -> &'static str {
///         "echo"
///     }
///
///     fn help_text(&self) -> &'static str {
///         "Repeat the arguments back"
///     }
///
///     async fn execute(&self, _ctx: &ExecutionContext, args: CommandArgs) -> BotResult<Reply> {
///         Ok(Reply::text(args.positional.join(" ")))
///     }
/// }
/// ```
#[async_trait]
pub trait Command: Send + Sync {
    /// Lowercase name the command is invoked by.
    fn name(&self) -> &'static str;

    /// One-line description shown by `help`.
    fn help_text(&self) -> &'static str;

    /// Whether only admins may run this command.
    fn requires_admin(&self) -> bool {
        false
    }

    /// Short switch names and the long names they resolve to.
    ///
    /// The dispatcher rewrites aliases before the handler sees them.
    fn switch_aliases(&self) -> &'static [(&'static str, &'static str)] {
        &[]
    }

    /// Per-command timeout, overriding the configured default.
    ///
    /// Override this for commands that call out to the network.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Execute the command.
    async fn execute(&self, ctx: &ExecutionContext, args: CommandArgs) -> BotResult<Reply>;

    /// Registry definition for this builtin.
    fn definition(&self) -> CommandDefinition {
        CommandDefinition::builtin(self.name(), self.help_text(), self.requires_admin())
    }
}
