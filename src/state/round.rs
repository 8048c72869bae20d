//! Ephemeral record of the phase each lobby is currently running.

use std::time::SystemTime;

use dashmap::DashMap;

use crate::{
    dao::models::{LobbyId, RoundId},
    state::state_machine::RoundPhase,
};

/// Live phase of a lobby and when its deadline elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeRoundState {
    /// Round the lobby is running.
    pub round_id: RoundId,
    /// Phase the deadline was armed for.
    pub phase: RoundPhase,
    /// When that phase's deadline elapses.
    pub phase_ends_at: SystemTime,
}

impl RuntimeRoundState {
    /// True when this state still describes `round_id` in `phase`.
    pub fn is_at(&self, round_id: RoundId, phase: RoundPhase) -> bool {
        self.round_id == round_id && self.phase == phase
    }
}

/// Lobby id → [`RuntimeRoundState`]. Entries live from round start until the terminal phase.
#[derive(Default)]
pub struct RoundStateStore {
    rounds: DashMap<LobbyId, RuntimeRoundState>,
}

impl RoundStateStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy out the live state of a lobby.
    pub fn get(&self, lobby_id: LobbyId) -> Option<RuntimeRoundState> {
        self.rounds.get(&lobby_id).map(|entry| *entry.value())
    }

    /// Install or overwrite the live state of a lobby.
    pub fn set(&self, lobby_id: LobbyId, state: RuntimeRoundState) {
        self.rounds.insert(lobby_id, state);
    }

    /// Forget the live state of a lobby, returning what was stored.
    pub fn remove(&self, lobby_id: LobbyId) -> Option<RuntimeRoundState> {
        self.rounds.remove(&lobby_id).map(|(_, state)| state)
    }

    /// Number of lobbies with a live round.
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    /// True when no lobby has a live round.
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn runtime(round_id: RoundId, phase: RoundPhase) -> RuntimeRoundState {
        RuntimeRoundState {
            round_id,
            phase,
            phase_ends_at: SystemTime::UNIX_EPOCH + Duration::from_secs(60),
        }
    }

    #[test]
    fn set_overwrites_previous_phase() {
        let store = RoundStateStore::new();
        store.set(1, runtime(10, RoundPhase::ProductSubmission));
        store.set(1, runtime(10, RoundPhase::Commenting));

        let state = store.get(1).unwrap();
        assert_eq!(state.phase, RoundPhase::Commenting);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn lobbies_are_independent() {
        let store = RoundStateStore::new();
        store.set(1, runtime(10, RoundPhase::Voting));
        store.set(2, runtime(11, RoundPhase::Commenting));

        assert_eq!(store.remove(1).unwrap().round_id, 10);
        assert!(store.get(1).is_none());
        assert_eq!(store.get(2).unwrap().phase, RoundPhase::Commenting);
    }

    #[test]
    fn is_at_requires_matching_round_and_phase() {
        let state = runtime(10, RoundPhase::Commenting);
        assert!(state.is_at(10, RoundPhase::Commenting));
        assert!(!state.is_at(10, RoundPhase::ProductSubmission));
        assert!(!state.is_at(11, RoundPhase::Commenting));
    }
}
