//! Player Records
//!
//! A connection's state is split between two owners:
//!
//! - [`Player`] travels through the matchmaking queue into a match engine and
//!   owns the receiving end of the action channel.
//! - [`PlayerLink`] stays with the connection reader and owns the sending end.
//!
//! Dropping the link closes the action channel, which the engine reads as a
//! disconnect whether or not the player was in a match at the time.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::game::action::Action;
use crate::network::outbound::{OutboundGate, TransportError};
use crate::network::protocol::ServerMessage;

/// Actions buffered between a reader and its match engine.
pub const ACTION_CAPACITY: usize = 16;

/// Unique player identifier, one per connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub uuid::Uuid);

impl PlayerId {
    /// Fresh random id.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    /// Short hex prefix, enough to tell players apart in logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.as_bytes()[..4]))
    }
}

/// What is waiting on a player's action channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending {
    /// Nothing pending; the connection is still up.
    Idle,
    /// The connection has gone away.
    Disconnected,
}

/// Engine-side half of a connection.
#[derive(Debug)]
pub struct Player {
    id: PlayerId,
    actions: mpsc::Receiver<Action>,
    outbound: OutboundGate,
    in_match: Arc<AtomicBool>,
}

/// Reader-side half of a connection.
#[derive(Debug)]
pub struct PlayerLink {
    id: PlayerId,
    actions: mpsc::Sender<Action>,
    outbound: OutboundGate,
    in_match: Arc<AtomicBool>,
}

impl Player {
    /// Create both halves for a new connection.
    pub fn connect(outbound: OutboundGate) -> (Player, PlayerLink) {
        let id = PlayerId::new();
        let (tx, rx) = mpsc::channel(ACTION_CAPACITY);
        let in_match = Arc::new(AtomicBool::new(false));

        let player = Player {
            id,
            actions: rx,
            outbound: outbound.clone(),
            in_match: in_match.clone(),
        };
        let link = PlayerLink {
            id,
            actions: tx,
            outbound,
            in_match,
        };
        (player, link)
    }

    /// Player identifier.
    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Queue a message for this player's connection without waiting.
    ///
    /// Fails with [`TransportError::Backlogged`] if the client has stopped
    /// reading.
    pub fn send(&self, msg: ServerMessage) -> Result<(), TransportError> {
        self.outbound.try_send(msg)
    }

    /// Wait for the next action. A closed channel reads as a disconnect.
    pub async fn next_action(&mut self) -> Action {
        self.actions.recv().await.unwrap_or(Action::Disconnect)
    }

    /// Discard anything queued before the match began.
    ///
    /// Stale presses are dropped; a disconnect, signalled or implied by a
    /// closed channel, is reported.
    pub fn drain_pending(&mut self) -> Pending {
        loop {
            match self.actions.try_recv() {
                Ok(Action::Press(_)) => continue,
                Ok(Action::Disconnect) | Err(TryRecvError::Disconnected) => {
                    return Pending::Disconnected
                }
                Err(TryRecvError::Empty) => return Pending::Idle,
            }
        }
    }

    /// Mark the player as in or out of a match.
    pub fn set_in_match(&self, in_match: bool) {
        self.in_match.store(in_match, Ordering::Release);
    }

    /// Whether the player is currently in a match.
    pub fn in_match(&self) -> bool {
        self.in_match.load(Ordering::Acquire)
    }
}

impl PlayerLink {
    /// Player identifier.
    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Outbound gate shared with the engine.
    pub fn outbound(&self) -> &OutboundGate {
        &self.outbound
    }

    /// Whether the engine has the player in a match.
    pub fn in_match(&self) -> bool {
        self.in_match.load(Ordering::Acquire)
    }

    /// Hand an action to the engine.
    ///
    /// Returns false if no engine is listening any more.
    pub async fn forward(&self, action: Action) -> bool {
        self.actions.send(action).await.is_ok()
    }
}
