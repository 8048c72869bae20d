use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dao::models::{CommentId, LobbyId, RoundId},
    dto::round::{
        CommentSummary, ProductSummary, RoundSnapshot, RoundSummary, SubmitCommentRequest,
        SubmitProductRequest, SubmitVoteRequest, VoteSummary,
    },
    error::AppError,
    services::round_service,
    state::SharedState,
};

/// Routes driving the round lifecycle of a lobby.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/lobbies/{lobby_id}/rounds",
            post(start_round).get(list_rounds),
        )
        .route("/lobbies/{lobby_id}/rounds/current", get(current_round))
        .route("/lobbies/{lobby_id}/rounds/advance", post(advance_round))
        .route(
            "/lobbies/{lobby_id}/rounds/{round_id}/product",
            post(submit_product),
        )
        .route(
            "/lobbies/{lobby_id}/rounds/{round_id}/comments",
            post(submit_comment),
        )
        .route(
            "/lobbies/{lobby_id}/comments/{comment_id}/votes",
            post(submit_vote),
        )
}

/// Start the next round of a lobby.
#[utoipa::path(
    post,
    path = "/lobbies/{lobby_id}/rounds",
    tag = "rounds",
    params(("lobby_id" = i64, Path, description = "Lobby starting a round")),
    responses(
        (status = 200, description = "Round started", body = RoundSummary),
        (status = 404, description = "Unknown lobby"),
        (status = 409, description = "Lobby has no members")
    )
)]
pub async fn start_round(
    State(state): State<SharedState>,
    Path(lobby_id): Path<LobbyId>,
) -> Result<Json<RoundSummary>, AppError> {
    let round = round_service::start_round(&state, lobby_id).await?;
    Ok(Json(RoundSummary::from(&round)))
}

/// Every round played in a lobby.
#[utoipa::path(
    get,
    path = "/lobbies/{lobby_id}/rounds",
    tag = "rounds",
    params(("lobby_id" = i64, Path, description = "Lobby to inspect")),
    responses((status = 200, description = "Round history", body = [RoundSummary]))
)]
pub async fn list_rounds(
    State(state): State<SharedState>,
    Path(lobby_id): Path<LobbyId>,
) -> Result<Json<Vec<RoundSummary>>, AppError> {
    let rounds = round_service::round_history(&state, lobby_id).await?;
    Ok(Json(rounds))
}

/// Current round of a lobby with its live deadline.
#[utoipa::path(
    get,
    path = "/lobbies/{lobby_id}/rounds/current",
    tag = "rounds",
    params(("lobby_id" = i64, Path, description = "Lobby to inspect")),
    responses(
        (status = 200, description = "Current round", body = RoundSnapshot),
        (status = 404, description = "Unknown lobby or no round yet")
    )
)]
pub async fn current_round(
    State(state): State<SharedState>,
    Path(lobby_id): Path<LobbyId>,
) -> Result<Json<RoundSnapshot>, AppError> {
    let snapshot = round_service::current_round(&state, lobby_id).await?;
    Ok(Json(snapshot))
}

/// Force the current round into its next phase without waiting for the deadline.
#[utoipa::path(
    post,
    path = "/lobbies/{lobby_id}/rounds/advance",
    tag = "rounds",
    params(("lobby_id" = i64, Path, description = "Lobby to advance")),
    responses((status = 200, description = "Advanced round, or null when nothing could advance", body = RoundSummary))
)]
pub async fn advance_round(
    State(state): State<SharedState>,
    Path(lobby_id): Path<LobbyId>,
) -> Result<Json<Option<RoundSummary>>, AppError> {
    let round = round_service::advance_phase(&state, lobby_id).await?;
    Ok(Json(round.as_ref().map(RoundSummary::from)))
}

/// Upload the product of the current round.
#[utoipa::path(
    post,
    path = "/lobbies/{lobby_id}/rounds/{round_id}/product",
    tag = "rounds",
    params(
        ("lobby_id" = i64, Path, description = "Lobby of the round"),
        ("round_id" = i64, Path, description = "Round receiving the product")
    ),
    request_body = SubmitProductRequest,
    responses(
        (status = 200, description = "Product stored, round moved to commenting", body = ProductSummary),
        (status = 409, description = "Round is not accepting products")
    )
)]
pub async fn submit_product(
    State(state): State<SharedState>,
    Path((lobby_id, round_id)): Path<(LobbyId, RoundId)>,
    Valid(Json(payload)): Valid<Json<SubmitProductRequest>>,
) -> Result<Json<ProductSummary>, AppError> {
    let product = round_service::submit_product(&state, lobby_id, round_id, payload).await?;
    Ok(Json(ProductSummary::from(&product)))
}

/// Comment on the product of a round.
#[utoipa::path(
    post,
    path = "/lobbies/{lobby_id}/rounds/{round_id}/comments",
    tag = "rounds",
    params(
        ("lobby_id" = i64, Path, description = "Lobby of the round"),
        ("round_id" = i64, Path, description = "Round being commented")
    ),
    request_body = SubmitCommentRequest,
    responses((status = 200, description = "Comment stored", body = CommentSummary))
)]
pub async fn submit_comment(
    State(state): State<SharedState>,
    Path((lobby_id, round_id)): Path<(LobbyId, RoundId)>,
    Valid(Json(payload)): Valid<Json<SubmitCommentRequest>>,
) -> Result<Json<CommentSummary>, AppError> {
    let comment = round_service::submit_comment(&state, lobby_id, round_id, payload).await?;
    Ok(Json(CommentSummary::from(&comment)))
}

/// Vote for a comment.
#[utoipa::path(
    post,
    path = "/lobbies/{lobby_id}/comments/{comment_id}/votes",
    tag = "rounds",
    params(
        ("lobby_id" = i64, Path, description = "Lobby of the comment"),
        ("comment_id" = i64, Path, description = "Comment receiving the vote")
    ),
    request_body = SubmitVoteRequest,
    responses((status = 200, description = "Vote stored", body = VoteSummary))
)]
pub async fn submit_vote(
    State(state): State<SharedState>,
    Path((lobby_id, comment_id)): Path<(LobbyId, CommentId)>,
    Valid(Json(payload)): Valid<Json<SubmitVoteRequest>>,
) -> Result<Json<VoteSummary>, AppError> {
    let vote = round_service::submit_vote(&state, lobby_id, comment_id, payload).await?;
    Ok(Json(VoteSummary::from(&vote)))
}
