use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the product review backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::lobby_stream,
        crate::routes::round::start_round,
        crate::routes::round::list_rounds,
        crate::routes::round::current_round,
        crate::routes::round::advance_round,
        crate::routes::round::submit_product,
        crate::routes::round::submit_comment,
        crate::routes::round::submit_vote,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::phase::VisibleRoundPhase,
            crate::dto::round::SubmitProductRequest,
            crate::dto::round::SubmitCommentRequest,
            crate::dto::round::SubmitVoteRequest,
            crate::dto::round::RoundSummary,
            crate::dto::round::RoundSnapshot,
            crate::dto::round::ProductSummary,
            crate::dto::round::CommentSummary,
            crate::dto::round::VoteSummary,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::RoundStartedEvent,
            crate::dto::sse::PhaseUpdateEvent,
            crate::dto::sse::ProductSubmittedEvent,
            crate::dto::sse::CommentSubmittedEvent,
            crate::dto::sse::VoteSubmittedEvent,
            crate::dto::sse::RoundWinnerEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "rounds", description = "Round lifecycle of a lobby"),
    )
)]
/// OpenAPI document of every route and payload.
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_round_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/lobbies/{lobby_id}/rounds"));
        assert!(paths.contains_key("/lobbies/{lobby_id}/comments/{comment_id}/votes"));
        assert!(paths.contains_key("/sse/lobbies/{lobby_id}"));
    }
}
