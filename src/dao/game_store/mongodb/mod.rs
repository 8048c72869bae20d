mod config;
mod connection;
mod error;
mod models;
/// [`GameStore`](crate::dao::game_store::GameStore) implementation over MongoDB.
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoGameStore;
