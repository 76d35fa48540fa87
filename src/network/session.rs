//! Match Session Management
//!
//! Runs one duel from pairing to teardown: the start check, the round loop
//! with its deadline, and the final win/lose broadcast.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::game::action::{Action, Button};
use crate::game::sequence::Judgement;
use crate::game::state::{EndReason, MatchState, Role};
use crate::network::matchmaking::QueueHandle;
use crate::network::player::{Pending, Player, PlayerId};
use crate::network::protocol::ServerMessage;
use crate::{INITIAL_DEADLINE_MS, REPLAY_DEADLINE_MS};

/// Unique match identifier.
pub type MatchId = uuid::Uuid;

/// Configuration for a match session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Time allowed for the first press of the match.
    pub initial_deadline: Duration,
    /// Time allowed for every press after an accepted one.
    pub replay_deadline: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_deadline: Duration::from_millis(INITIAL_DEADLINE_MS),
            replay_deadline: Duration::from_millis(REPLAY_DEADLINE_MS),
        }
    }
}

/// How a finished match went.
#[derive(Debug, Clone, Serialize)]
pub struct MatchOutcome {
    /// Match identifier.
    pub match_id: MatchId,
    /// Why it ended.
    pub reason: EndReason,
    /// Player told "win".
    pub winner: PlayerId,
    /// The other player. Told "lose" unless they disconnected.
    pub loser: PlayerId,
    /// Confirmed sequence length at the end.
    pub sequence_len: usize,
    /// Role swaps played.
    pub rounds: u32,
    /// Wall-clock start.
    pub started_at: DateTime<Utc>,
    /// Wall-clock end.
    pub ended_at: DateTime<Utc>,
}

/// What a match task reports back to the pairing loop.
#[derive(Debug, Clone)]
pub enum SessionReport {
    /// A player was gone before the match began.
    Skipped {
        /// Survivor sent back to the queue, if any.
        requeued: Option<PlayerId>,
    },
    /// The match was played to an end.
    Finished(MatchOutcome),
}

/// A freshly paired match in `Starting`.
pub struct MatchSession {
    id: MatchId,
    config: SessionConfig,
    first: Player,
    second: Player,
    queue: QueueHandle,
    state: MatchState,
}

impl MatchSession {
    /// Pair two players. `first` starts as the active player.
    pub fn new(first: Player, second: Player, config: SessionConfig, queue: QueueHandle) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            config,
            first,
            second,
            queue,
            state: MatchState::new(),
        }
    }

    /// Short hex form of the id for logs.
    pub fn short_id(&self) -> String {
        hex::encode(&self.id.as_bytes()[..4])
    }

    /// Run the match to completion.
    #[instrument(skip(self), fields(match_id = %self.short_id()))]
    pub async fn run(self) -> SessionReport {
        let MatchSession {
            id,
            config,
            mut first,
            mut second,
            queue,
            mut state,
        } = self;

        let survivor = match (first.drain_pending(), second.drain_pending()) {
            (Pending::Idle, Pending::Idle) => {
                if let Err(e) = state.begin() {
                    warn!("Match could not start: {}", e);
                    return SessionReport::Skipped { requeued: None };
                }
                let mut live = LiveMatch::begin(id, config, state, first, second);
                let reason = live.play().await;
                return SessionReport::Finished(live.finish(reason));
            }
            (Pending::Idle, Pending::Disconnected) => Some(first),
            (Pending::Disconnected, Pending::Idle) => Some(second),
            (Pending::Disconnected, Pending::Disconnected) => None,
        };

        let requeued = match survivor {
            Some(player) => {
                let player_id = player.id();
                info!("Opponent left before start, requeueing player {}", player_id);
                match queue.submit(player).await {
                    Ok(()) => Some(player_id),
                    Err(e) => {
                        warn!("Could not requeue player {}: {}", player_id, e);
                        None
                    }
                }
            }
            None => {
                info!("Both players left before start");
                None
            }
        };
        SessionReport::Skipped { requeued }
    }
}

/// A match in `InProgress`.
struct LiveMatch {
    id: MatchId,
    config: SessionConfig,
    active: Player,
    other: Player,
    state: MatchState,
    started_at: DateTime<Utc>,
}

impl LiveMatch {
    /// Flag both players and tell them their seats. `state` is `InProgress`.
    fn begin(
        id: MatchId,
        config: SessionConfig,
        state: MatchState,
        active: Player,
        other: Player,
    ) -> Self {
        // Flag first so a press sent right after the start notice is forwarded.
        active.set_in_match(true);
        other.set_in_match(true);

        for (player, notice) in [
            (&active, ServerMessage::StartActive),
            (&other, ServerMessage::StartObserver),
        ] {
            if let Err(e) = player.send(notice) {
                debug!("Start notice to player {} failed: {}", player.id(), e);
            }
        }

        info!("Match started: {} (active) vs {}", active.id(), other.id());

        Self {
            id,
            config,
            active,
            other,
            state,
            started_at: Utc::now(),
        }
    }

    fn seat(&self, role: Role) -> &Player {
        match role {
            Role::Active => &self.active,
            Role::Other => &self.other,
        }
    }

    /// Round loop. Returns the single reason the match ended.
    ///
    /// Handlers never wait on a client, so the deadline is always polled.
    async fn play(&mut self) -> EndReason {
        let deadline = tokio::time::sleep(self.config.initial_deadline);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => return EndReason::TimerExpired,
                action = self.active.next_action() => match action {
                    Action::Disconnect => return EndReason::OpponentDisconnected(Role::Active),
                    Action::Press(button) => {
                        if let Err(reason) = self.on_active_press(button) {
                            return reason;
                        }
                        deadline.as_mut().reset(Instant::now() + self.config.replay_deadline);
                    }
                },
                action = self.other.next_action() => match action {
                    Action::Disconnect => return EndReason::OpponentDisconnected(Role::Other),
                    Action::Press(button) => {
                        if let Err(reason) = self.show_press(Role::Active, button) {
                            return reason;
                        }
                    }
                },
            }
        }
    }

    /// Show the press to the opponent, then judge it.
    fn on_active_press(&mut self, button: Button) -> Result<(), EndReason> {
        self.show_press(Role::Other, button)?;

        let judgement = self.state.judge(button).map_err(|e| {
            warn!("Press after end: {}", e);
            EndReason::WrongPress
        })?;

        match judgement {
            Judgement::NewRound => {
                debug!(
                    len = self.state.sequence().len(),
                    "Player {} extended the sequence with {}",
                    self.active.id(),
                    button
                );
                std::mem::swap(&mut self.active, &mut self.other);
            }
            Judgement::Correct => {}
            Judgement::Mismatch { expected, position } => {
                debug!(
                    "Player {} pressed {} at position {}, expected {}",
                    self.active.id(),
                    button,
                    position,
                    expected
                );
            }
        }

        if judgement.is_accepted() {
            Ok(())
        } else {
            Err(EndReason::WrongPress)
        }
    }

    /// Forward a press to the player in `to`.
    ///
    /// A client that has stopped reading counts as gone.
    fn show_press(&self, to: Role, button: Button) -> Result<(), EndReason> {
        let player = self.seat(to);
        player.send(ServerMessage::OpponentPressed(button)).map_err(|e| {
            warn!("Dropping player {} from match: {}", player.id(), e);
            EndReason::OpponentDisconnected(to)
        })
    }

    /// `InProgress -> Ended`: tell the survivors, clear flags, release players.
    fn finish(mut self, reason: EndReason) -> MatchOutcome {
        let reason = match self.state.end(reason) {
            Ok(reason) => reason,
            Err(e) => {
                warn!("{}", e);
                reason
            }
        };

        for role in [Role::Active, Role::Other] {
            let player = self.seat(role);
            if let Some(standing) = reason.standing_for(role) {
                if let Err(e) = player.send(ServerMessage::outcome(standing)) {
                    debug!("Outcome notice to player {} failed: {}", player.id(), e);
                }
            }
            player.set_in_match(false);
        }

        let outcome = MatchOutcome {
            match_id: self.id,
            reason,
            winner: self.seat(reason.winner()).id(),
            loser: self.seat(reason.loser()).id(),
            sequence_len: self.state.sequence().len(),
            rounds: self.state.rounds(),
            started_at: self.started_at,
            ended_at: Utc::now(),
        };

        info!(reason = ?outcome.reason, "Match ended, player {} wins", outcome.winner);
        match serde_json::to_string(&outcome) {
            Ok(summary) => debug!(%summary, "Match summary"),
            Err(e) => warn!("Failed to serialize match summary: {}", e),
        }

        // Dropping both players closes their action channels.
        outcome
    }
}
