use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{dao::models::LobbyId, services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sse/lobbies/{lobby_id}",
    tag = "sse",
    params(("lobby_id" = i64, Path, description = "Lobby whose room to join")),
    responses((status = 200, description = "Lobby SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream the round events of one lobby to its players.
pub async fn lobby_stream(
    State(state): State<SharedState>,
    Path(lobby_id): Path<LobbyId>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let subscription = sse_service::subscribe_lobby(&state, lobby_id);
    info!(lobby_id, "new lobby SSE connection");
    sse_service::to_sse_stream(subscription, lobby_id)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/lobbies/{lobby_id}", get(lobby_stream))
}
