//! Connection Reader
//!
//! One task per connection. Decodes inbound frames into liveness replies or
//! forwarded presses, and reports the disconnect when the socket goes away.

use futures_util::{Sink, Stream, StreamExt};
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::debug;

use crate::game::action::Action;
use crate::network::matchmaking::{QueueError, QueueHandle};
use crate::network::outbound::{OutboundGate, TransportError};
use crate::network::player::{Player, PlayerLink};
use crate::network::protocol::{ClientMessage, ServerMessage};

/// Why a connection stopped.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Read or write failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Matchmaking is no longer accepting players.
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Serve one upgraded connection until it closes.
///
/// The new player enters matchmaking before the first frame is read.
pub async fn serve_connection<St, Si>(
    stream: St,
    sink: Si,
    queue: &QueueHandle,
) -> Result<(), ConnectionError>
where
    St: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    Si: Sink<Message, Error = tungstenite::Error> + Unpin + Send + 'static,
{
    // The writer task is detached: it ends once the player and link are gone.
    let (gate, _writer) = OutboundGate::spawn(sink);
    let (player, link) = Player::connect(gate);
    let player_id = player.id();

    queue.submit(player).await?;
    debug!("Player {} queued", player_id);

    read_frames(stream, link).await?;
    Ok(())
}

/// Read frames until the socket closes or fails.
///
/// On exit, an in-match player's engine is told about the disconnect. The
/// link is dropped either way, which closes the action channel.
pub async fn read_frames<St>(mut stream: St, link: PlayerLink) -> Result<(), TransportError>
where
    St: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    let result = loop {
        let frame = match stream.next().await {
            Some(Ok(Message::Close(_))) | None => {
                debug!("Player {} disconnected", link.id());
                break Ok(());
            }
            Some(Err(e)) => {
                debug!("WebSocket error for player {}: {}", link.id(), e);
                break Err(TransportError::from(e));
            }
            // Control frames are answered by tungstenite itself.
            Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
            Some(Ok(frame)) => frame,
        };

        #[cfg(feature = "debug-tracing")]
        tracing::trace!(player = %link.id(), ?frame, "inbound frame");

        match ClientMessage::from_frame(&frame) {
            Ok(ClientMessage::Here) => {
                if let Err(e) = link.outbound().send(ServerMessage::Seen).await {
                    break Err(e);
                }
            }
            Ok(ClientMessage::Press(button)) => {
                if link.in_match() && !link.forward(Action::Press(button)).await {
                    debug!("No match listening for player {}, press dropped", link.id());
                }
            }
            Err(e) => debug!("Ignoring message from player {}: {}", link.id(), e),
        }
    };

    if link.in_match() && !link.forward(Action::Disconnect).await {
        debug!("No match listening for player {} disconnect", link.id());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use tokio::sync::mpsc;

    use crate::game::action::Button;
    use crate::network::player::Pending;

    fn frames(texts: &[&str]) -> Vec<Result<Message, tungstenite::Error>> {
        texts.iter().map(|t| Ok(Message::Text(t.to_string()))).collect()
    }

    fn test_player() -> (Player, PlayerLink, mpsc::Receiver<ServerMessage>) {
        let (gate, outbox) = OutboundGate::channel(16);
        let (player, link) = Player::connect(gate);
        (player, link, outbox)
    }

    #[tokio::test]
    async fn test_liveness_answered_outside_match() {
        let (_player, link, mut outbox) = test_player();
        let input = stream::iter(frames(&["here", "here"]));

        read_frames(input, link).await.unwrap();

        assert_eq!(outbox.recv().await, Some(ServerMessage::Seen));
        assert_eq!(outbox.recv().await, Some(ServerMessage::Seen));
    }

    #[tokio::test]
    async fn test_presses_dropped_outside_match() {
        let (mut player, link, _outbox) = test_player();
        let input = stream::iter(frames(&["button1", "button2"]));

        read_frames(input, link).await.unwrap();

        // Only the closed channel remains: no presses were queued.
        assert_eq!(player.next_action().await, Action::Disconnect);
    }

    #[tokio::test]
    async fn test_presses_forwarded_in_match() {
        let (mut player, link, mut outbox) = test_player();
        player.set_in_match(true);
        let input = stream::iter(frames(&["button0", "junk", "here", "button2"]));

        read_frames(input, link).await.unwrap();

        assert_eq!(player.next_action().await, Action::Press(Button::Zero));
        assert_eq!(player.next_action().await, Action::Press(Button::Two));
        assert_eq!(player.next_action().await, Action::Disconnect);
        assert_eq!(outbox.recv().await, Some(ServerMessage::Seen));
    }

    #[tokio::test]
    async fn test_stale_in_match_flag_keeps_reader_alive() {
        let (player, link, mut outbox) = test_player();
        player.set_in_match(true);
        drop(player);
        let input = stream::iter(frames(&["button1", "here"]));

        read_frames(input, link).await.unwrap();
        assert_eq!(outbox.recv().await, Some(ServerMessage::Seen));
    }

    #[tokio::test]
    async fn test_transport_error_signals_disconnect() {
        let (mut player, link, _outbox) = test_player();
        player.set_in_match(true);
        let input = stream::iter(vec![
            Ok(Message::Text("button1".into())),
            Err(tungstenite::Error::ConnectionClosed),
            Ok(Message::Text("button2".into())),
        ]);

        let result = read_frames(input, link).await;

        assert!(matches!(result, Err(TransportError::WebSocket(_))));
        assert_eq!(player.next_action().await, Action::Press(Button::One));
        assert_eq!(player.next_action().await, Action::Disconnect);
    }

    #[tokio::test]
    async fn test_close_frame_ends_reader() {
        let (mut player, link, _outbox) = test_player();
        let input = stream::iter(vec![
            Ok(Message::Close(None)),
            Ok(Message::Text("here".into())),
        ]);

        read_frames(input, link).await.unwrap();
        assert_eq!(player.drain_pending(), Pending::Disconnected);
    }
}
