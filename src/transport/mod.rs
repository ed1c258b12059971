//! Chat transport boundary.
//!
//! The bot core only needs to send replies to a channel and receive
//! inbound messages. Concrete chat platforms plug in behind
//! [`ChatTransport`].

mod console;
mod memory;
mod message;
mod traits;

pub use console::ConsoleTransport;
pub use memory::MemoryTransport;
pub use message::{EmbedField, InboundMessage, Reply, RichMessage, Sender};
pub use traits::ChatTransport;
