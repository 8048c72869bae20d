//! Failures of the MongoDB backend before they are folded into storage errors.

use mongodb::error::Error as MongoError;
use thiserror::Error;

/// Result alias for MongoDB operations.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Every way a MongoDB call can fail, with the collection or setting involved.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// `MONGO_URI` could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// URI as given.
        uri: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A required environment variable is unset.
    #[error("missing environment variable `{var}`")]
    MissingEnvVar {
        /// Variable name.
        var: &'static str,
    },
    /// The driver rejected the parsed options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The server never answered while connecting.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Pings tried before giving up.
        attempts: u32,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A periodic ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Index creation failed at startup.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        /// Collection involved.
        collection: &'static str,
        /// Index name.
        index: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The id counter could not be incremented.
    #[error("failed to allocate an id for collection `{collection}`")]
    NextId {
        /// Collection involved.
        collection: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The counter upsert returned no document.
    #[error("id counter for collection `{collection}` was not returned")]
    CounterMissing {
        /// Collection whose counter is missing.
        collection: &'static str,
    },
    /// An insert was rejected.
    #[error("failed to insert into `{collection}`")]
    Insert {
        /// Collection involved.
        collection: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A lookup by id failed.
    #[error("failed to load `{id}` from `{collection}`")]
    Load {
        /// Collection involved.
        collection: &'static str,
        /// Document id.
        id: i64,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// An update by id failed.
    #[error("failed to update `{id}` in `{collection}`")]
    Update {
        /// Collection involved.
        collection: &'static str,
        /// Document id.
        id: i64,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A filtered read failed.
    #[error("failed to query `{collection}`")]
    Query {
        /// Collection involved.
        collection: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
}
