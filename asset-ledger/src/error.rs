//! Error types for the asset ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Operation targets a key that does not exist
    #[error("the asset {0} does not exist")]
    NotFound(String),

    /// Creation targets a key that already exists
    #[error("the asset {0} already exists")]
    AlreadyExists(String),

    /// Stored bytes do not parse into an asset record
    #[error("failed to decode asset {key}: {source}")]
    Decode {
        /// Store key of the malformed record
        key: String,
        /// Underlying parse failure
        #[source]
        source: serde_json::Error,
    },

    /// Asset could not be serialized
    #[error("failed to encode asset: {0}")]
    Encode(#[source] serde_json::Error),

    /// Underlying store call failed (RocksDB, cursor, transport)
    #[error("failed to access world state: {0}")]
    Storage(String),

    /// Read set was invalidated by a concurrent commit
    #[error("read-write conflict on key {key} in transaction {tx_id}")]
    Conflict {
        /// Transaction that lost the race
        tx_id: String,
        /// First key whose committed version changed
        key: String,
    },

    /// Caller supplied an argument the operation cannot accept
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Lifecycle enforcement rejected a status change
    #[error("asset {product_id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Asset being mutated
        product_id: String,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for failures of the store itself rather than of the operation's preconditions.
    pub fn is_store_error(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::Conflict { .. })
    }

    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::AlreadyExists(_) => "already_exists",
            Error::Decode { .. } => "decode",
            Error::Encode(_) => "encode",
            Error::Storage(_) => "storage",
            Error::Conflict { .. } => "conflict",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
        }
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(format!("Failed to parse config: {}", err))
    }
}
