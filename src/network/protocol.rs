//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every message is a short plain-text frame.

use std::fmt;
use std::str::FromStr;

use tokio_tungstenite::tungstenite::Message;

use crate::game::action::Button;
use crate::game::state::Standing;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMessage {
    /// Liveness probe (`here`).
    Here,
    /// Button press (`button0` .. `button2`).
    Press(Button),
}

impl ClientMessage {
    /// Decode a WebSocket frame.
    pub fn from_frame(frame: &Message) -> Result<Self, ProtocolError> {
        match frame {
            Message::Text(text) => text.parse(),
            _ => Err(ProtocolError::UnsupportedFrame),
        }
    }
}

impl FromStr for ClientMessage {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "here" => Ok(ClientMessage::Here),
            "button0" => Ok(ClientMessage::Press(Button::Zero)),
            "button1" => Ok(ClientMessage::Press(Button::One)),
            "button2" => Ok(ClientMessage::Press(Button::Two)),
            other => Err(ProtocolError::UnknownMessage(other.chars().take(32).collect())),
        }
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMessage {
    /// Liveness acknowledgment (`seen`).
    Seen,
    /// You start as the active player (`starty`).
    StartActive,
    /// You start as the observing player (`startt`).
    StartObserver,
    /// Opponent pressed a button (`button<N>`).
    OpponentPressed(Button),
    /// You won (`win`).
    Win,
    /// You lost (`lose`).
    Lose,
}

impl ServerMessage {
    /// Outcome notice for a standing.
    pub fn outcome(standing: Standing) -> Self {
        match standing {
            Standing::Win => ServerMessage::Win,
            Standing::Lose => ServerMessage::Lose,
        }
    }

    /// Encode as a WebSocket text frame.
    pub fn to_frame(&self) -> Message {
        Message::Text(self.to_string())
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Seen => f.write_str("seen"),
            ServerMessage::StartActive => f.write_str("starty"),
            ServerMessage::StartObserver => f.write_str("startt"),
            ServerMessage::OpponentPressed(button) => write!(f, "button{}", button),
            ServerMessage::Win => f.write_str("win"),
            ServerMessage::Lose => f.write_str("lose"),
        }
    }
}

/// Protocol errors. None of these are fatal to a connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Text frame outside the protocol.
    #[error("Unknown message: {0:?}")]
    UnknownMessage(String),

    /// Binary or control frame where text was expected.
    #[error("Unsupported frame type")]
    UnsupportedFrame,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_client_messages() {
        assert_eq!("here".parse(), Ok(ClientMessage::Here));
        assert_eq!("button0".parse(), Ok(ClientMessage::Press(Button::Zero)));
        assert_eq!("button2".parse(), Ok(ClientMessage::Press(Button::Two)));
    }

    #[test]
    fn test_unknown_messages_rejected() {
        for text in ["button3", "Here", "", "button", "button01"] {
            assert!(matches!(
                text.parse::<ClientMessage>(),
                Err(ProtocolError::UnknownMessage(_))
            ));
        }
    }

    #[test]
    fn test_binary_frame_rejected() {
        let frame = Message::Binary(b"button1".to_vec());
        assert_eq!(ClientMessage::from_frame(&frame), Err(ProtocolError::UnsupportedFrame));
    }

    #[test]
    fn test_server_wire_text() {
        let cases = [
            (ServerMessage::Seen, "seen"),
            (ServerMessage::StartActive, "starty"),
            (ServerMessage::StartObserver, "startt"),
            (ServerMessage::OpponentPressed(Button::One), "button1"),
            (ServerMessage::Win, "win"),
            (ServerMessage::Lose, "lose"),
        ];
        for (msg, text) in cases {
            assert_eq!(msg.to_frame(), Message::Text(text.to_string()));
        }
    }

    #[test]
    fn test_outcome_notice() {
        assert_eq!(ServerMessage::outcome(Standing::Win), ServerMessage::Win);
        assert_eq!(ServerMessage::outcome(Standing::Lose), ServerMessage::Lose);
    }
}
