//! Library crate for product-review-back, exposing modules for binaries and tests.

/// Runtime settings loaded from `config/app.json`.
pub mod config;
/// Persistence layer.
pub mod dao;
/// HTTP and SSE payloads.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// Axum routers.
pub mod routes;
/// Business logic behind the routes.
pub mod services;
/// Shared in-process state.
pub mod state;
