use axum::Router;

use crate::state::SharedState;

/// Swagger UI and OpenAPI document.
pub mod docs;
/// Health check route.
pub mod health;
/// Round lifecycle routes.
pub mod round;
/// Lobby event stream.
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(round::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
