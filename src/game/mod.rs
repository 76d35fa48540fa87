//! Game Logic Module
//!
//! Duel rules with no I/O and no clocks.
//!
//! ## Module Structure
//!
//! - `action`: Button alphabet and per-connection actions
//! - `sequence`: Append-only button sequence with replay cursor
//! - `state`: Match phases, roles, end reasons

pub mod action;
pub mod sequence;
pub mod state;

// Re-export key types
pub use action::{Action, Button};
pub use sequence::{Judgement, Sequence};
pub use state::{EndReason, MatchPhase, MatchState, Role, Standing, StateError};
