//! One cancellable deadline per lobby.

use std::{future::Future, sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::{task::JoinHandle, time::sleep};
use tracing::debug;
use uuid::Uuid;

use crate::dao::models::LobbyId;

/// Identifies one arming of a lobby timer.
pub type TimerToken = Uuid;

struct ArmedTimer {
    token: TimerToken,
    handle: JoinHandle<()>,
}

/// Registry of outstanding phase deadlines keyed by lobby.
///
/// Arming a lobby aborts whatever was armed for it before, so at most one timer per
/// lobby can be waiting at any time.
#[derive(Default)]
pub struct PhaseTimers {
    armed: Arc<DashMap<LobbyId, ArmedTimer>>,
}

impl PhaseTimers {
    /// Registry with nothing armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `on_fire` once `delay` has elapsed unless the lobby is re-armed or disarmed first.
    pub fn arm<F, Fut>(&self, lobby_id: LobbyId, delay: Duration, on_fire: F) -> TimerToken
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = Uuid::new_v4();
        let armed = Arc::clone(&self.armed);

        let handle = tokio::spawn(async move {
            sleep(delay).await;
            // Leave the registry before running: the callback may re-arm this lobby and
            // must not abort itself while doing so.
            armed.remove_if(&lobby_id, |_, timer| timer.token == token);
            on_fire().await;
        });

        if let Some(previous) = self.armed.insert(lobby_id, ArmedTimer { token, handle }) {
            previous.handle.abort();
            debug!(lobby_id, "superseded pending phase timer");
        }

        token
    }

    /// Cancel the pending timer of a lobby. Returns whether one was armed.
    pub fn disarm(&self, lobby_id: LobbyId) -> bool {
        match self.armed.remove(&lobby_id) {
            Some((_, timer)) => {
                timer.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel every pending timer, used when the process shuts down.
    pub fn disarm_all(&self) {
        self.armed.retain(|_, timer| {
            timer.handle.abort();
            false
        });
    }

    /// Token of the timer currently waiting for a lobby.
    pub fn armed_token(&self, lobby_id: LobbyId) -> Option<TimerToken> {
        self.armed.get(&lobby_id).map(|timer| timer.token)
    }
}
