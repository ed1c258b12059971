//! Line-oriented transport over stdin/stdout.
//!
//! Each input line is one inbound message: either a JSON object with
//! `channel`, `sender` and `text`, or plain text attributed to the
//! configured console user.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::config::ConsoleConfig;
use crate::error::{BotError, BotResult};

use super::message::{InboundMessage, Reply, Sender};
use super::traits::ChatTransport;

/// Console transport.
pub struct ConsoleTransport {
    config: ConsoleConfig,
    stdout: Mutex<tokio::io::Stdout>,
}

impl ConsoleTransport {
    pub fn new(config: ConsoleConfig) -> Self {
        Self {
            config,
            stdout: Mutex::new(tokio::io::stdout()),
        }
    }

    /// Turn one input line into an inbound message.
    ///
    /// Blank lines yield nothing. Lines that look like JSON but fail to
    /// parse are treated as plain text.
    pub fn parse_line(&self, line: &str) -> Option<InboundMessage> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        if line.starts_with('{') {
            match serde_json::from_str::<InboundMessage>(line) {
                Ok(message) => return Some(message),
                Err(e) => debug!(error = %e, "Console line is not a JSON message"),
            }
        }

        let sender = Sender {
            id: self.config.user_id.clone(),
            name: self.config.user_name.clone(),
            admin: self.config.admin,
        };
        Some(InboundMessage::new(
            self.config.channel.clone(),
            Some(sender),
            line,
        ))
    }

    /// Read stdin on a background task, yielding parsed messages.
    ///
    /// The channel closes when stdin reaches end of file.
    pub fn spawn_reader(self: &Arc<Self>) -> mpsc::Receiver<InboundMessage> {
        let (tx, rx) = mpsc::channel(64);
        let transport = Arc::clone(self);

        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if let Some(message) = transport.parse_line(&line) {
                            if tx.send(message).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(None) => {
                        debug!("Console input closed");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to read console input");
                        break;
                    }
                }
            }
        });

        rx
    }
}

#[async_trait]
impl ChatTransport for ConsoleTransport {
    async fn send(&self, channel: &str, reply: Reply) -> BotResult<()> {
        let rendered = format!("[#{}] {}\n", channel, reply);
        let mut stdout = self.stdout.lock().await;
        stdout
            .write_all(rendered.as_bytes())
            .await
            .map_err(|e| BotError::Transport {
                message: format!("Failed to write reply: {}", e),
            })?;
        stdout.flush().await.map_err(|e| BotError::Transport {
            message: format!("Failed to flush reply: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> ConsoleTransport {
        ConsoleTransport::new(ConsoleConfig::default())
    }

    #[test]
    fn test_plain_line_uses_console_user() {
        let message = transport().parse_line("  >ping ").unwrap();
        assert_eq!(message.channel, "console");
        assert_eq!(message.text, ">ping");
        let sender = message.sender.unwrap();
        assert_eq!(sender.id, "console");
        assert!(sender.admin);
    }

    #[test]
    fn test_json_line() {
        let message = transport()
            .parse_line(r#"{"channel": "memes", "text": ">doge"}"#)
            .unwrap();
        assert_eq!(message.channel, "memes");
        assert!(message.sender.is_none());
    }

    #[test]
    fn test_blank_and_broken_json() {
        let transport = transport();
        assert!(transport.parse_line("   ").is_none());
        let message = transport.parse_line("{not json").unwrap();
        assert_eq!(message.text, "{not json");
    }
}
