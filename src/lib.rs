//! Cabinet - a typed, async record store.
//!
//! Records implement [`Storable`] and are described by a [`Schema`] in a
//! read-only [`Registry`]. A [`Cabinet`] stages inserts and updates in memory
//! and commits them atomically on [`Cabinet::save`]; deletes write through and
//! cascade into registered dependent entities.

mod cabinet;
mod config;
mod context;
mod delivery;
mod error;
mod query;
mod registry;
mod storable;
mod store;

pub use cabinet::Cabinet;
pub use config::{CabinetConfig, CascadeMode, MappingPolicy};
pub use context::{ContextState, StoreContext};
pub use delivery::{Delivery, DELIVERY_THREAD};
pub use error::{CabinetError, Result, StoreError, StoreResult};
pub use query::{compare_values, sort_rows, Condition, Operator, Predicate, Query, SortKey, SortOrder};
pub use registry::{Registry, RegistryBuilder, Schema};
pub use storable::{from_row, merge_fields, row_uuid, to_row, Row, Storable};
pub use store::{BackingStore, ChangeOp, FileStore, InMemoryStore, OpenStore};

// Re-export the derive macro and the identifier type records use
pub use cabinet_macros::Storable;
pub use uuid::Uuid;
