//! Outbound half of the bridge.

use swarmview_protocol::Message;
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Sink for messages travelling from the client to the engine.
///
/// Implementations must not block; the client calls `send` while no lock is
/// held but from arbitrary tasks.
pub trait Transport: Send + Sync + 'static {
    /// Hand a message to the engine side.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] when the engine side has gone away.
    fn send(&self, message: Message) -> Result<(), TransportError>;
}

/// Transport backed by an unbounded tokio channel.
///
/// The receiving half is drained by whatever owns the engine connection: a
/// stdio writer task in the binary, a scripted engine in tests.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    sender: mpsc::UnboundedSender<Message>,
}

impl ChannelTransport {
    /// Create a transport and the receiver that observes its messages.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Transport for ChannelTransport {
    fn send(&self, message: Message) -> Result<(), TransportError> {
        self.sender
            .send(message)
            .map_err(|_| TransportError::Closed)
    }
}
