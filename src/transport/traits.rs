//! Transport trait definition.

use async_trait::async_trait;

use crate::error::BotResult;

use super::message::Reply;

/// Outbound half of a chat platform client.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a reply to a channel.
    ///
    /// Failures are reported but never fatal; callers log and move on.
    async fn send(&self, channel: &str, reply: Reply) -> BotResult<()>;
}
