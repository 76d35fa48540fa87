//! # Simon Duel Server
//!
//! Real-time two-player "Simon says" duels over WebSocket.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     SIMON DUEL SERVER                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  game/              - Rules (no I/O, no clocks)                │
//! │  ├── action.rs      - Buttons and per-connection actions       │
//! │  ├── sequence.rs    - Append-only sequence + replay cursor     │
//! │  └── state.rs       - Match phases, roles, end reasons         │
//! │                                                               │
//! │  network/           - Async plumbing                           │
//! │  ├── protocol.rs    - Text frame codec                         │
//! │  ├── outbound.rs    - Single-writer outbound gate              │
//! │  ├── player.rs      - Player record (engine + reader halves)   │
//! │  ├── reader.rs      - Per-connection reader task               │
//! │  ├── matchmaking.rs - Capacity-1 queue and pairing loop        │
//! │  ├── session.rs     - Match engine                             │
//! │  └── server.rs      - Accept loop, handshake, shutdown         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! socket ─► reader ─► action channel ─► match engine ─► outbound gate ─► socket
//!              │                              ▲
//!              └──────► matchmaking queue ────┘ (one engine task per pair)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod game;
pub mod network;

// Re-export commonly used types
pub use game::{Action, Button, EndReason, MatchState, Role, Sequence};
pub use network::{GameServer, GameServerError, ServerConfig, SessionConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8000;

/// Budget for the first press of a match (ms).
pub const INITIAL_DEADLINE_MS: u64 = 30_000;

/// Budget for every press after an accepted one (ms).
pub const REPLAY_DEADLINE_MS: u64 = 1_000;
