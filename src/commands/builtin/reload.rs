//! Reload command: rebuilds the registry from the store.

use async_trait::async_trait;

use crate::error::BotResult;
use crate::transport::Reply;

use super::super::traits::Command;
use super::super::types::{CommandArgs, ExecutionContext};

/// Forces a registry refresh.
pub struct ReloadCommand;

#[async_trait]
impl Command for ReloadCommand {
    fn name(&self) -> &'static str {
        "reload"
    }

    fn help_text(&self) -> &'static str {
        "Reload all commands from the database"
    }

    fn requires_admin(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &ExecutionContext, _args: CommandArgs) -> BotResult<Reply> {
        let count = ctx.registry.refresh().await?;
        Ok(Reply::text(format!(
            ":white_check_mark: Reloaded {} commands",
            count
        )))
    }
}
