use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::{
    dao::models::LobbyId,
    dto::sse::{Handshake, ServerEvent},
    services::sse_events,
    state::SharedState,
};

const EVENT_HANDSHAKE: &str = "handshake";

/// Join the room of a lobby. The first event the subscriber sees is a handshake.
pub fn subscribe_lobby(state: &SharedState, lobby_id: LobbyId) -> HandshakeReceiver {
    let receiver = state.rooms().subscribe(lobby_id);
    let handshake = ServerEvent::json(
        Some(EVENT_HANDSHAKE.to_string()),
        &Handshake {
            lobby_id,
            message: format!("subscribed to lobby {lobby_id}"),
            degraded: state.is_degraded(),
        },
    )
    .ok();
    HandshakeReceiver {
        handshake,
        receiver,
    }
}

/// Room receiver with the greeting to emit before any room event.
pub struct HandshakeReceiver {
    handshake: Option<ServerEvent>,
    receiver: broadcast::Receiver<ServerEvent>,
}

/// Convert a room subscription into an SSE response, forwarding events and
/// cleaning up once the client disconnects.
pub fn to_sse_stream(
    subscription: HandshakeReceiver,
    lobby_id: LobbyId,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let HandshakeReceiver {
        handshake,
        mut receiver,
    } = subscription;

    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if let Some(handshake) = handshake {
            if tx.send(Ok(to_event(handshake))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            // Skip lagged messages but keep the stream alive.
                            debug!(lobby_id, skipped, "SSE subscriber lagged");
                            continue;
                        }
                    }
                }
            }
        }

        info!(lobby_id, "lobby SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

/// Relay degraded-mode changes to every open lobby room. Runs for the lifetime of the server.
pub async fn forward_degraded_changes(state: SharedState) {
    let mut watcher = state.degraded_watcher();
    while watcher.changed().await.is_ok() {
        let degraded = *watcher.borrow_and_update();
        sse_events::broadcast_system_status(&state, degraded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, state::AppState};

    #[tokio::test]
    async fn subscription_starts_with_a_handshake() {
        let state = AppState::new(AppConfig::default());
        let subscription = subscribe_lobby(&state, 4);

        let handshake = subscription.handshake.as_ref().unwrap();
        assert_eq!(handshake.event.as_deref(), Some(EVENT_HANDSHAKE));
        let data: serde_json::Value = serde_json::from_str(&handshake.data).unwrap();
        assert_eq!(data["lobby_id"], 4);
        assert_eq!(data["degraded"], true);
        assert_eq!(state.rooms().room_count(), 1);
    }

    #[tokio::test]
    async fn degraded_changes_reach_open_rooms() {
        let state = AppState::new(AppConfig::default());
        let mut subscription = subscribe_lobby(&state, 1);
        let forwarder = tokio::spawn(forward_degraded_changes(state.clone()));
        tokio::task::yield_now().await;

        state.update_degraded(false);
        let event = subscription.receiver.recv().await.unwrap();

        assert_eq!(event.event.as_deref(), Some(sse_events::EVENT_SYSTEM_STATUS));
        assert_eq!(event.data, r#"{"degraded":false}"#);
        forwarder.abort();
    }
}
