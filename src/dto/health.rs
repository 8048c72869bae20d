use serde::Serialize;
use utoipa::ToSchema;

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Lobbies with at least one SSE subscriber.
    pub open_rooms: usize,
    /// Rounds whose phase deadline is running on this server.
    pub live_rounds: usize,
}

impl HealthResponse {
    /// Report `degraded` or `ok` together with the room and round counts.
    pub fn new(degraded: bool, open_rooms: usize, live_rounds: usize) -> Self {
        let status = if degraded { "degraded" } else { "ok" };
        Self {
            status: status.to_string(),
            open_rooms,
            live_rounds,
        }
    }
}
