//! Rendering of dynamic command replies.

use crate::transport::{Reply, RichMessage};

use super::definition::CommandDefinition;
use super::types::ExecutionContext;

/// Embed colour of dynamic command replies.
pub const DYNAMIC_COLOR: u32 = 0x00a8ff;

/// Build the reply of a dynamic command from its payload.
pub fn render(definition: &CommandDefinition, ctx: &ExecutionContext) -> Reply {
    let payload = &definition.payload;
    let mut message = RichMessage::new()
        .color(DYNAMIC_COLOR)
        .footer(format!("Requested by {}", ctx.sender_name()));

    if let Some(title) = &payload.title {
        message = message.title(title.clone());
    }
    if let Some(body) = &payload.body {
        message = message.description(body.clone());
    }
    if let Some(url) = &payload.image_url {
        message = message.image_url(url.clone());
    }

    Reply::Rich(message)
}
