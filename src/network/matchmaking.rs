//! Matchmaking Queue
//!
//! Single-slot rendezvous that pairs players two at a time in arrival order.
//! Each pair gets its own match task; the pairing loop never waits on a match.

use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, instrument};

use crate::network::player::Player;
use crate::network::session::{MatchSession, SessionConfig, SessionReport};

/// Players the queue holds before submitters wait.
pub const QUEUE_CAPACITY: usize = 1;

/// Matchmaking errors.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The pairing loop has stopped.
    #[error("Matchmaking queue closed")]
    Closed,
}

/// Cloneable entry point into the queue.
#[derive(Debug, Clone)]
pub struct QueueHandle {
    tx: mpsc::Sender<Player>,
}

impl QueueHandle {
    /// Handle plus the receiving end, for whoever runs the pairing.
    pub(crate) fn channel(capacity: usize) -> (Self, mpsc::Receiver<Player>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Add a player to the back of the queue.
    pub async fn submit(&self, player: Player) -> Result<(), QueueError> {
        self.tx.send(player).await.map_err(|_| QueueError::Closed)
    }
}

/// Counters reported when the pairing loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairingStats {
    /// Pairs handed to a match task.
    pub paired: u64,
    /// Matches that were played to an end.
    pub finished: u64,
    /// Pairs dropped at start because a player was already gone.
    pub skipped: u64,
    /// Match tasks that panicked.
    pub crashed: u64,
}

impl PairingStats {
    fn record(&mut self, joined: Result<SessionReport, JoinError>) {
        match joined {
            Ok(SessionReport::Finished(_)) => self.finished += 1,
            Ok(SessionReport::Skipped { .. }) => self.skipped += 1,
            Err(e) if e.is_panic() => {
                error!("Match task panicked: {}", e);
                self.crashed += 1;
            }
            Err(e) => debug!("Match task cancelled: {}", e),
        }
    }
}

/// The queue and its pairing loop.
pub struct MatchmakingQueue {
    handle: QueueHandle,
    rx: mpsc::Receiver<Player>,
    config: SessionConfig,
}

impl MatchmakingQueue {
    /// Create an empty queue whose matches use `config`.
    pub fn new(config: SessionConfig) -> Self {
        let (handle, rx) = QueueHandle::channel(QUEUE_CAPACITY);
        Self { handle, rx, config }
    }

    /// Handle for submitting players.
    pub fn handle(&self) -> QueueHandle {
        self.handle.clone()
    }

    /// Pair players until shutdown.
    ///
    /// Match tasks live in a `JoinSet`; a panicking match is logged and
    /// counted without disturbing the loop or other matches. Running matches
    /// are aborted on shutdown.
    #[instrument(skip_all)]
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> PairingStats {
        let mut stats = PairingStats::default();
        let mut waiting: Option<Player> = None;
        let mut matches = JoinSet::new();

        loop {
            tokio::select! {
                Some(player) = self.rx.recv() => {
                    match waiting.take() {
                        None => {
                            debug!("Player {} waiting for an opponent", player.id());
                            waiting = Some(player);
                        }
                        Some(first) => {
                            let session = MatchSession::new(first, player, self.config.clone(), self.handle.clone());
                            debug!("Paired players for match {}", session.short_id());
                            matches.spawn(session.run());
                            stats.paired += 1;
                        }
                    }
                }
                Some(joined) = matches.join_next(), if !matches.is_empty() => {
                    stats.record(joined);
                }
                _ = shutdown.recv() => {
                    info!("Matchmaking shutting down");
                    break;
                }
            }
        }

        // Matches already over are still counted; the rest are cancelled.
        matches.abort_all();
        while let Some(joined) = matches.join_next().await {
            stats.record(joined);
        }
        info!(
            paired = stats.paired,
            finished = stats.finished,
            skipped = stats.skipped,
            crashed = stats.crashed,
            "Matchmaking stopped"
        );
        stats
    }
}
