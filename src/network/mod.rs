//! Network Layer
//!
//! WebSocket server, matchmaking and match sessions.
//! Everything here is async; the rules it applies live in `game/`.

pub mod matchmaking;
pub mod outbound;
pub mod player;
pub mod protocol;
pub mod reader;
pub mod server;
pub mod session;

pub use matchmaking::{MatchmakingQueue, PairingStats, QueueError, QueueHandle};
pub use outbound::{OutboundGate, TransportError};
pub use player::{Player, PlayerId, PlayerLink};
pub use protocol::{ClientMessage, ProtocolError, ServerMessage};
pub use reader::{read_frames, serve_connection, ConnectionError};
pub use server::{GameServer, GameServerError, ServerConfig};
pub use session::{MatchId, MatchOutcome, MatchSession, SessionConfig, SessionReport};
