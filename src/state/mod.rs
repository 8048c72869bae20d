/// Live phase and deadline of each lobby.
pub mod round;
/// Per-lobby broadcast rooms.
pub mod sse;
/// Round phases and their transition table.
pub mod state_machine;
/// Cancellable phase deadlines.
pub mod timer;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, watch};

use crate::{
    config::AppConfig,
    dao::{game_store::GameStore, models::LobbyId},
    error::ServiceError,
    services::turn_policy::CurrentPlayerPolicy,
};

pub use self::sse::{RoomHub, SseHub};
use self::{round::RoundStateStore, timer::PhaseTimers};

/// Handle passed to every handler and background task.
pub type SharedState = Arc<AppState>;

type LobbyGates = DashMap<LobbyId, Arc<Mutex<()>>>;

/// Exclusive hold on one lobby's gate.
///
/// Releasing it also drops the lobby's map entry once nobody else holds or waits on
/// that gate, so the map only tracks lobbies in use.
pub struct LobbyGuard {
    lobby_id: LobbyId,
    gates: Arc<LobbyGates>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for LobbyGuard {
    fn drop(&mut self) {
        self.guard.take();
        self.gates
            .remove_if(&self.lobby_id, |_, gate| Arc::strong_count(gate) == 1);
    }
}

/// Central application state: storage handle, live rounds, timers and SSE rooms.
pub struct AppState {
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    degraded: watch::Sender<bool>,
    config: AppConfig,
    player_policy: Arc<dyn CurrentPlayerPolicy>,
    rooms: RoomHub,
    rounds: RoundStateStore,
    timers: PhaseTimers,
    lobby_gates: Arc<LobbyGates>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let policy = config.player_policy.build();
        Self::with_player_policy(config, policy)
    }

    /// Same as [`AppState::new`] with an explicit current-player policy.
    pub fn with_player_policy(
        config: AppConfig,
        player_policy: Arc<dyn CurrentPlayerPolicy>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            game_store: RwLock::new(None),
            degraded: degraded_tx,
            rooms: RoomHub::new(config.room_capacity),
            config,
            player_policy,
            rounds: RoundStateStore::new(),
            timers: PhaseTimers::new(),
            lobby_gates: Arc::default(),
        })
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Game store for an engine operation, or [`ServiceError::Degraded`].
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn install_game_store(&self, store: Arc<dyn GameStore>) {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current game store and enter degraded mode.
    pub async fn clear_game_store(&self) {
        {
            let mut guard = self.game_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update the degraded flag, notifying watchers only when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Settings the state was built with.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Policy choosing the acting player of new rounds.
    pub fn player_policy(&self) -> &dyn CurrentPlayerPolicy {
        self.player_policy.as_ref()
    }

    /// Per-lobby SSE rooms.
    pub fn rooms(&self) -> &RoomHub {
        &self.rooms
    }

    /// Live phase of every running round.
    pub fn rounds(&self) -> &RoundStateStore {
        &self.rounds
    }

    /// Pending phase deadlines.
    pub fn timers(&self) -> &PhaseTimers {
        &self.timers
    }

    /// Serialise round mutations of one lobby. Other lobbies are never blocked.
    pub async fn lock_lobby(&self, lobby_id: LobbyId) -> LobbyGuard {
        let gate = Arc::clone(self.lobby_gates.entry(lobby_id).or_default().value());
        LobbyGuard {
            lobby_id,
            gates: Arc::clone(&self.lobby_gates),
            guard: Some(gate.lock_owned().await),
        }
    }

    /// Cancel every pending phase deadline. In-flight rounds are not recovered.
    pub fn shutdown(&self) {
        self.timers.disarm_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::game_store::memory::InMemoryGameStore;

    #[tokio::test]
    async fn starts_degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default());
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_game_store().await,
            Err(ServiceError::Degraded)
        ));

        state
            .install_game_store(Arc::new(InMemoryGameStore::new()))
            .await;
        assert!(!state.is_degraded());
        assert!(state.require_game_store().await.is_ok());

        state.clear_game_store().await;
        assert!(state.is_degraded());
    }

    #[tokio::test]
    async fn degraded_watchers_only_see_changes() {
        let state = AppState::new(AppConfig::default());
        let mut watcher = state.degraded_watcher();

        state.update_degraded(true);
        assert!(!watcher.has_changed().unwrap());

        state.update_degraded(false);
        assert!(watcher.has_changed().unwrap());
        assert!(!*watcher.borrow_and_update());
    }

    #[tokio::test]
    async fn lobby_gates_are_independent() {
        let state = AppState::new(AppConfig::default());
        let _first = state.lock_lobby(1).await;

        assert!(state.lobby_gates.get(&1).unwrap().try_lock().is_err());
        let _second = state.lock_lobby(2).await;
    }

    #[tokio::test]
    async fn released_gates_are_forgotten() {
        let state = AppState::new(AppConfig::default());
        let first = state.lock_lobby(1).await;
        let waiter = {
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                let _gate = state.lock_lobby(1).await;
            })
        };
        tokio::task::yield_now().await;

        drop(first);
        // The waiter still shares the gate, so the entry survives the first release.
        waiter.await.unwrap();

        assert!(state.lobby_gates.is_empty());
        let _again = state.lock_lobby(1).await;
        assert_eq!(state.lobby_gates.len(), 1);
    }
}
