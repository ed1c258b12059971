//! Inbound and outbound message types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The member that sent a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub id: String,
    pub name: String,
    /// Whether the platform reports this member as an administrator.
    #[serde(default)]
    pub admin: bool,
}

impl Sender {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            admin: false,
        }
    }

    /// Same sender, flagged as a platform administrator.
    pub fn as_admin(mut self) -> Self {
        self.admin = true;
        self
    }
}

/// A message observed by the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub channel: String,
    /// Absent for system or webhook messages.
    #[serde(default)]
    pub sender: Option<Sender>,
    pub text: String,
}

impl InboundMessage {
    pub fn new(channel: impl Into<String>, sender: Option<Sender>, text: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            sender,
            text: text.into(),
        }
    }
}

/// A labeled field of a rich message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Structured reply: title, colour, fields, footer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RichMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl RichMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}

/// Content sent back to a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum Reply {
    Text(String),
    Rich(RichMessage),
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }

    /// Text body if this is a plain reply.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Reply::Text(text) => Some(text),
            Reply::Rich(_) => None,
        }
    }

    /// Rich body if this is a structured reply.
    pub fn as_rich(&self) -> Option<&RichMessage> {
        match self {
            Reply::Text(_) => None,
            Reply::Rich(rich) => Some(rich),
        }
    }
}

impl From<RichMessage> for Reply {
    fn from(rich: RichMessage) -> Self {
        Reply::Rich(rich)
    }
}

/// Plain-text rendering, used by text-only transports.
impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Text(text) => f.write_str(text),
            Reply::Rich(rich) => {
                let mut lines = Vec::new();
                if let Some(title) = &rich.title {
                    lines.push(format!("== {} ==", title));
                }
                if let Some(description) = &rich.description {
                    lines.push(description.clone());
                }
                for field in &rich.fields {
                    lines.push(format!("{}: {}", field.name, field.value));
                }
                if let Some(url) = &rich.image_url {
                    lines.push(format!("[image] {}", url));
                }
                if let Some(footer) = &rich.footer {
                    lines.push(format!("-- {}", footer));
                }
                f.write_str(&lines.join("\n"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_from_json() {
        let msg: InboundMessage = serde_json::from_str(
            r#"{"channel": "general", "sender": {"id": "7", "name": "mod"}, "text": ">help"}"#,
        )
        .unwrap();
        assert_eq!(msg.channel, "general");
        assert_eq!(msg.sender, Some(Sender::new("7", "mod")));

        let anonymous: InboundMessage =
            serde_json::from_str(r#"{"channel": "general", "text": "hi"}"#).unwrap();
        assert!(anonymous.sender.is_none());
    }

    #[test]
    fn test_rich_display() {
        let reply: Reply = RichMessage::new()
            .title("Greeting")
            .description("Hello!")
            .field("Admin", "no", true)
            .footer("Requested by mod")
            .into();
        let text = reply.to_string();
        assert!(text.contains("== Greeting =="));
        assert!(text.contains("Admin: no"));
        assert!(text.ends_with("-- Requested by mod"));
    }
}
