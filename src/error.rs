use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by a backing store primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Generic backend failure (database, remote service, ...).
    #[error("backing store error: {0}")]
    Backend(String),

    /// The query could not be executed (malformed predicate, unknown operator).
    #[error("malformed query: {0}")]
    Query(String),

    /// Filesystem failure.
    #[error("store I/O error: {0}")]
    Io(String),

    /// Stored bytes could not be encoded or decoded.
    #[error("store serialization error: {0}")]
    Serialization(String),

    /// A lock guarding store state was poisoned by a panicking thread.
    #[error("store lock poisoned during {0}")]
    LockPoisoned(&'static str),

    /// The store does not support the requested configuration.
    #[error("unsupported store configuration: {0}")]
    Unsupported(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type for backing store primitives.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors surfaced to callers of the record store.
#[derive(Debug, Clone, Error)]
pub enum CabinetError {
    /// No schema was registered for the entity.
    #[error("entity not registered: {0}")]
    UnregisteredEntity(String),

    /// Two schemas were registered under the same entity name.
    #[error("entity registered twice: {0}")]
    DuplicateEntity(String),

    /// A schema cascades into an entity that is not registered.
    #[error("entity {entity} cascades into unregistered entity {cascade}")]
    UnknownCascade { entity: String, cascade: String },

    /// The backing store failed to execute a read. No partial results were delivered.
    #[error("fetch failed: {0}")]
    FetchFailed(#[source] StoreError),

    /// The backing store failed to persist a write. Pending changes are kept.
    #[error("commit failed: {0}")]
    CommitFailed(#[source] StoreError),

    /// A cascade step failed after earlier steps were already durable.
    #[error("cascade delete of {entity} failed after parent rows were removed: {source}")]
    PartialCascadeFailure {
        entity: String,
        #[source]
        source: StoreError,
    },

    /// A stored row could not be mapped into its record type (strict mapping only).
    #[error("row {id:?} of {entity} could not be mapped")]
    Mapping { entity: String, id: Option<Uuid> },

    /// The backing store failed to open; the context is permanently failed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The operation did not complete within the configured timeout.
    #[error("operation timed out after {0:?}")]
    TimedOut(Duration),

    /// The background task running the operation was cancelled or panicked.
    #[error("operation cancelled")]
    Cancelled,

    /// The change buffer lock was poisoned by a panicking thread.
    #[error("change buffer lock poisoned during {0}")]
    LockPoisoned(&'static str),
}

/// Result type for record store operations.
pub type Result<T> = std::result::Result<T, CabinetError>;
