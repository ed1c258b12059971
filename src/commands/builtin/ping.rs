//! Ping command for health checking.

use async_trait::async_trait;
use chrono::Utc;

use crate::error::BotResult;
use crate::transport::Reply;

use super::super::traits::Command;
use super::super::types::{CommandArgs, ExecutionContext};

/// Simple ping command that replies with a pong.
///
/// Used to check that the bot is responsive.
pub struct PingCommand;

#[async_trait]
impl Command for PingCommand {
    fn name(&self) -> &'static str {
        "ping"
    }

    fn help_text(&self) -> &'static str {
        "Check that the bot is alive"
    }

    async fn execute(&self, ctx: &ExecutionContext, _args: CommandArgs) -> BotResult<Reply> {
        let latency_ms = (Utc::now() - ctx.received_at).num_milliseconds().max(0);
        Ok(Reply::text(format!(":ping_pong: Pong! ({} ms)", latency_ms)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{create_test_context, create_test_registry};
    use super::*;

    #[test]
    fn test_ping_name() {
        let cmd = PingCommand;
        assert_eq!(cmd.name(), "ping");
        assert!(!cmd.requires_admin());
    }

    #[tokio::test]
    async fn test_ping_execute() {
        let registry = create_test_registry().await;
        let ctx = create_test_context(&registry, "ping", false);

        let reply = PingCommand.execute(&ctx, CommandArgs::default()).await.unwrap();
        assert!(reply.as_text().unwrap().contains("Pong!"));
    }
}
