use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Ping the storage backend and report degraded mode plus live round counters.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_game_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    HealthResponse::new(
        state.is_degraded(),
        state.rooms().room_count(),
        state.rounds().len(),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig, dao::game_store::memory::InMemoryGameStore, state::AppState,
    };

    #[tokio::test]
    async fn reports_degraded_without_storage() {
        let state = AppState::new(AppConfig::default());
        assert_eq!(health_status(&state).await.status, "degraded");
    }

    #[tokio::test]
    async fn reports_ok_and_counts_rooms() {
        let state = AppState::new(AppConfig::default());
        state
            .install_game_store(Arc::new(InMemoryGameStore::new()))
            .await;
        let _listener = state.rooms().subscribe(3);

        let health = health_status(&state).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.open_rooms, 1);
        assert_eq!(health.live_rounds, 0);
    }
}
