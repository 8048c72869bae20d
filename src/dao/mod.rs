/// Persistence gateway trait and its backends.
pub mod game_store;
/// Durable record definitions shared by every backend.
pub mod models;
/// Backend-agnostic storage errors.
pub mod storage;
