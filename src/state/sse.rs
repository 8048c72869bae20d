use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::{dao::models::LobbyId, dto::sse::ServerEvent};

/// Simple broadcast hub wrapper used by the SSE services.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }

    fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

/// One [`SseHub`] per lobby ("room"). Delivery is best-effort: events sent to a room
/// nobody listens to are dropped.
pub struct RoomHub {
    rooms: DashMap<LobbyId, SseHub>,
    capacity: usize,
}

impl RoomHub {
    /// Hub whose rooms each buffer `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            capacity,
        }
    }

    /// Join the room of a lobby, creating its channel on first use.
    pub fn subscribe(&self, lobby_id: LobbyId) -> broadcast::Receiver<ServerEvent> {
        self.rooms
            .entry(lobby_id)
            .or_insert_with(|| SseHub::new(self.capacity))
            .subscribe()
    }

    /// Deliver an event to everyone currently in the room of a lobby.
    pub fn broadcast(&self, lobby_id: LobbyId, event: ServerEvent) {
        if let Some(hub) = self.rooms.get(&lobby_id) {
            hub.broadcast(event);
        }
        self.rooms.remove_if(&lobby_id, |_, hub| !hub.has_subscribers());
    }

    /// Deliver an event to every open room, pruning rooms nobody listens to anymore.
    pub fn broadcast_all(&self, event: ServerEvent) {
        self.rooms.retain(|_, hub| {
            hub.broadcast(event.clone());
            hub.has_subscribers()
        });
    }

    /// Number of rooms with an open channel.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str) -> ServerEvent {
        ServerEvent::new(Some(name.to_string()), "{}".to_string())
    }

    #[test]
    fn events_stay_inside_their_room() {
        let hub = RoomHub::new(8);
        let mut lobby_one = hub.subscribe(1);
        let mut lobby_two = hub.subscribe(2);

        hub.broadcast(1, event("phase_update"));

        assert_eq!(
            lobby_one.try_recv().unwrap().event.as_deref(),
            Some("phase_update")
        );
        assert!(lobby_two.try_recv().is_err());
    }

    #[test]
    fn abandoned_rooms_are_pruned() {
        let hub = RoomHub::new(8);
        let receiver = hub.subscribe(1);
        assert_eq!(hub.room_count(), 1);

        drop(receiver);
        hub.broadcast(1, event("round_started"));
        assert_eq!(hub.room_count(), 0);
    }

    #[test]
    fn broadcast_all_reaches_every_room() {
        let hub = RoomHub::new(8);
        let mut lobby_one = hub.subscribe(1);
        let mut lobby_two = hub.subscribe(2);

        hub.broadcast_all(event("system_status"));

        assert!(lobby_one.try_recv().is_ok());
        assert!(lobby_two.try_recv().is_ok());
    }

    #[test]
    fn broadcasting_to_an_empty_room_is_a_no_op() {
        let hub = RoomHub::new(8);
        hub.broadcast(7, event("round_winner"));
        assert_eq!(hub.room_count(), 0);
    }
}
