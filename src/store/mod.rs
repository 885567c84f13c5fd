//! Backing store - the durable storage the record store delegates to.
//!
//! Any type providing the four primitives (open, query, batch delete,
//! commit) can back a `Cabinet`. Two implementations ship with the crate:
//!
//! - [`InMemoryStore`]: HashMap-backed, for tests and short-lived processes
//! - [`FileStore`]: a JSON document on disk, rewritten atomically per commit

mod file;
mod in_memory;

use uuid::Uuid;

use crate::config::CabinetConfig;
use crate::error::StoreResult;
use crate::query::Predicate;
use crate::storable::Row;

pub use file::FileStore;
pub use in_memory::InMemoryStore;

/// A buffered write handed to [`BackingStore::commit`].
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeOp {
    /// Insert or fully replace the row stored under `id`.
    Upsert { entity: String, id: Uuid, row: Row },
    /// Remove the row stored under `id`, if any.
    Delete { entity: String, id: Uuid },
}

impl ChangeOp {
    pub fn entity(&self) -> &str {
        match self {
            ChangeOp::Upsert { entity, .. } | ChangeOp::Delete { entity, .. } => entity,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            ChangeOp::Upsert { id, .. } | ChangeOp::Delete { id, .. } => *id,
        }
    }
}

/// Query, batch delete, and commit primitives over durable storage.
pub trait BackingStore: Send + Sync + 'static {
    /// Rows of `entity` matching `predicate`, in store order.
    fn query(&self, entity: &str, predicate: &Predicate) -> StoreResult<Vec<Row>>;

    /// Durably delete every row of `entity` whose `field` holds one of `ids`.
    /// Returns the number of rows removed.
    fn batch_delete(&self, entity: &str, field: &str, ids: &[Uuid]) -> StoreResult<usize>;

    /// Apply `ops` atomically: either every op is persisted or none is.
    fn commit(&self, ops: &[ChangeOp]) -> StoreResult<()>;
}

/// Backing stores that can be opened from configuration.
pub trait OpenStore: BackingStore + Sized {
    /// Open the store named by `config`, creating it if needed.
    fn open_or_create(config: &CabinetConfig) -> StoreResult<Self>;
}

impl<S: BackingStore> BackingStore for std::sync::Arc<S> {
    fn query(&self, entity: &str, predicate: &Predicate) -> StoreResult<Vec<Row>> {
        (**self).query(entity, predicate)
    }

    fn batch_delete(&self, entity: &str, field: &str, ids: &[Uuid]) -> StoreResult<usize> {
        (**self).batch_delete(entity, field, ids)
    }

    fn commit(&self, ops: &[ChangeOp]) -> StoreResult<()> {
        (**self).commit(ops)
    }
}
