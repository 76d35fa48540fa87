//! Match State Definitions
//!
//! Phase machine for a single duel. Transport-free: the network layer owns the
//! players and the deadline and feeds presses in here to be judged.

use serde::{Deserialize, Serialize};

use crate::game::action::Button;
use crate::game::sequence::{Judgement, Sequence};

// =============================================================================
// ROLES AND RESULTS
// =============================================================================

/// Seat a player holds for the current round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Presses are judged against the sequence.
    Active,
    /// Presses are shown to the opponent but not judged.
    Other,
}

impl Role {
    /// The opposite seat.
    #[inline]
    pub fn opponent(self) -> Self {
        match self {
            Role::Active => Role::Other,
            Role::Other => Role::Active,
        }
    }
}

/// What a player is told when the match ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Standing {
    /// Player won.
    Win,
    /// Player lost.
    Lose,
}

/// Why a match ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// No accepted press before the deadline.
    TimerExpired,
    /// The active player pressed the wrong button.
    WrongPress,
    /// The player in the given seat disconnected.
    OpponentDisconnected(Role),
}

impl EndReason {
    /// Notice owed to the player in `role`.
    ///
    /// A disconnected player gets nothing.
    pub fn standing_for(self, role: Role) -> Option<Standing> {
        match self {
            EndReason::TimerExpired | EndReason::WrongPress => match role {
                Role::Active => Some(Standing::Lose),
                Role::Other => Some(Standing::Win),
            },
            EndReason::OpponentDisconnected(gone) if gone == role => None,
            EndReason::OpponentDisconnected(_) => Some(Standing::Win),
        }
    }

    /// Seat of the winner.
    pub fn winner(self) -> Role {
        match self {
            EndReason::TimerExpired | EndReason::WrongPress => Role::Other,
            EndReason::OpponentDisconnected(gone) => gone.opponent(),
        }
    }

    /// Seat of the loser.
    #[inline]
    pub fn loser(self) -> Role {
        self.winner().opponent()
    }
}

// =============================================================================
// MATCH PHASE
// =============================================================================

/// Match lifecycle phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Paired, checking both players are still connected.
    Starting,
    /// Rounds are being played.
    InProgress,
    /// Terminal.
    Ended(EndReason),
}

/// State transition errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// Match already ended.
    #[error("Match already ended ({0:?})")]
    AlreadyEnded(EndReason),

    /// Press or end while the match is not being played.
    #[error("Match not in progress")]
    NotInProgress,
}

// =============================================================================
// MATCH STATE
// =============================================================================

/// Rules state of one match.
#[derive(Clone, Debug)]
pub struct MatchState {
    phase: MatchPhase,
    sequence: Sequence,
    /// Role swaps so far.
    rounds: u32,
}

impl MatchState {
    /// Fresh match in `Starting`.
    pub fn new() -> Self {
        Self {
            phase: MatchPhase::Starting,
            sequence: Sequence::new(),
            rounds: 0,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Sequence being built.
    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    /// Completed rounds (one per role swap).
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// `Starting -> InProgress`.
    pub fn begin(&mut self) -> Result<(), StateError> {
        match self.phase {
            MatchPhase::Starting => {
                self.phase = MatchPhase::InProgress;
                Ok(())
            }
            MatchPhase::InProgress => Err(StateError::NotInProgress),
            MatchPhase::Ended(reason) => Err(StateError::AlreadyEnded(reason)),
        }
    }

    /// Judge a press by the active player.
    ///
    /// A mismatch moves the match to `Ended(WrongPress)`.
    pub fn judge(&mut self, button: Button) -> Result<Judgement, StateError> {
        self.ensure_in_progress()?;

        let judgement = self.sequence.press(button);
        match judgement {
            Judgement::NewRound => self.rounds += 1,
            Judgement::Correct => {}
            Judgement::Mismatch { .. } => self.phase = MatchPhase::Ended(EndReason::WrongPress),
        }
        Ok(judgement)
    }

    /// Move to `Ended`. Only one end is ever recorded.
    pub fn end(&mut self, reason: EndReason) -> Result<EndReason, StateError> {
        match self.phase {
            MatchPhase::InProgress => {
                self.phase = MatchPhase::Ended(reason);
                Ok(reason)
            }
            // A wrong press already ended the match inside `judge`.
            MatchPhase::Ended(EndReason::WrongPress) if reason == EndReason::WrongPress => {
                Ok(reason)
            }
            MatchPhase::Ended(previous) => Err(StateError::AlreadyEnded(previous)),
            MatchPhase::Starting => Err(StateError::NotInProgress),
        }
    }

    fn ensure_in_progress(&self) -> Result<(), StateError> {
        match self.phase {
            MatchPhase::InProgress => Ok(()),
            MatchPhase::Ended(reason) => Err(StateError::AlreadyEnded(reason)),
            MatchPhase::Starting => Err(StateError::NotInProgress),
        }
    }
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new()
    }
}
