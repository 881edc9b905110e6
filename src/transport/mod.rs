//! Framed message transports between the battle server and its clients.

use crate::protocol::Message;

/// A bidirectional, ordered channel of protocol messages. `recv` fails once
/// the peer is gone, which the server treats as a disconnect.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&mut self, msg: Message) -> anyhow::Result<()>;
    async fn recv(&mut self) -> anyhow::Result<Message>;
}

pub mod in_memory;
pub mod tcp;
