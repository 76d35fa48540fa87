//! Outbound Gate
//!
//! Serializes writes to one WebSocket. Any number of tasks may hold a gate;
//! frames are queued and a single writer task owns the sink, so at most one
//! send is ever in flight per connection.

use futures_util::{Sink, SinkExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::debug;

use crate::network::protocol::ServerMessage;

/// Frames buffered per connection before senders wait.
pub const OUTBOUND_CAPACITY: usize = 64;

/// Transport errors. Terminal for the affected connection only.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The writer task has stopped; the connection is gone.
    #[error("Connection closed")]
    Closed,

    /// The peer is not reading; its queue is full.
    #[error("Outbound queue full")]
    Backlogged,

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
}

/// Cloneable handle that queues frames for one connection.
#[derive(Debug, Clone)]
pub struct OutboundGate {
    tx: mpsc::Sender<ServerMessage>,
}

impl OutboundGate {
    /// Gate plus the receiving end of its queue.
    ///
    /// Whoever holds the receiver is the single writer.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Gate whose writer task drains into `sink`.
    ///
    /// The task exits when every gate clone is dropped or the sink fails.
    pub fn spawn<S>(sink: S) -> (Self, JoinHandle<Result<(), TransportError>>)
    where
        S: Sink<Message, Error = tungstenite::Error> + Unpin + Send + 'static,
    {
        let (gate, rx) = Self::channel(OUTBOUND_CAPACITY);
        let writer = tokio::spawn(run_writer(sink, rx));
        (gate, writer)
    }

    /// Queue a message.
    pub async fn send(&self, msg: ServerMessage) -> Result<(), TransportError> {
        self.tx.send(msg).await.map_err(|_| TransportError::Closed)
    }

    /// Queue a message without waiting for room.
    ///
    /// Used where a slow reader must not hold up the caller.
    pub fn try_send(&self, msg: ServerMessage) -> Result<(), TransportError> {
        self.tx.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::Backlogged,
            TrySendError::Closed(_) => TransportError::Closed,
        })
    }
}

/// Drain queued messages into the sink, one at a time.
async fn run_writer<S>(
    mut sink: S,
    mut rx: mpsc::Receiver<ServerMessage>,
) -> Result<(), TransportError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    while let Some(msg) = rx.recv().await {
        if let Err(e) = sink.send(msg.to_frame()).await {
            debug!("Outbound write failed: {}", e);
            return Err(e.into());
        }
    }

    // Every gate dropped: say goodbye politely. The peer may already be gone.
    let _ = sink.close().await;
    Ok(())
}
