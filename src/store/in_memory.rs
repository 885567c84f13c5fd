//! InMemoryStore - HashMap-backed store for testing and development.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BackingStore, ChangeOp, OpenStore};
use crate::config::CabinetConfig;
use crate::error::{StoreError, StoreResult};
use crate::query::Predicate;
use crate::storable::{row_uuid, Row};

/// Rows per entity, keyed by identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Tables {
    entities: HashMap<String, BTreeMap<Uuid, Row>>,
}

impl Tables {
    pub(crate) fn query(&self, entity: &str, predicate: &Predicate) -> StoreResult<Vec<Row>> {
        predicate.validate()?;
        Ok(self
            .entities
            .get(entity)
            .map(|table| {
                table
                    .values()
                    .filter(|row| predicate.matches(row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    pub(crate) fn batch_delete(&mut self, entity: &str, field: &str, ids: &[Uuid]) -> usize {
        let Some(table) = self.entities.get_mut(entity) else {
            return 0;
        };
        let targets: HashSet<&Uuid> = ids.iter().collect();
        let before = table.len();
        table.retain(|_, row| {
            row_uuid(row, field)
                .map(|value| !targets.contains(&value))
                .unwrap_or(true)
        });
        before - table.len()
    }

    pub(crate) fn apply(&mut self, ops: &[ChangeOp]) {
        for op in ops {
            match op {
                ChangeOp::Upsert { entity, id, row } => {
                    self.entities
                        .entry(entity.clone())
                        .or_default()
                        .insert(*id, row.clone());
                }
                ChangeOp::Delete { entity, id } => {
                    if let Some(table) = self.entities.get_mut(entity) {
                        table.remove(id);
                    }
                }
            }
        }
    }

    pub(crate) fn len(&self, entity: &str) -> usize {
        self.entities.get(entity).map(BTreeMap::len).unwrap_or(0)
    }
}

/// In-memory backing store.
///
/// Clone-friendly via Arc: clones share the same tables, which lets a test
/// "restart" a `Cabinet` over the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed rows of `entity`.
    pub fn len(&self, entity: &str) -> StoreResult<usize> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::LockPoisoned("len"))?;
        Ok(tables.len(entity))
    }

    pub fn is_empty(&self, entity: &str) -> StoreResult<bool> {
        Ok(self.len(entity)? == 0)
    }
}

impl BackingStore for InMemoryStore {
    fn query(&self, entity: &str, predicate: &Predicate) -> StoreResult<Vec<Row>> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::LockPoisoned("query"))?;
        tables.query(entity, predicate)
    }

    fn batch_delete(&self, entity: &str, field: &str, ids: &[Uuid]) -> StoreResult<usize> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::LockPoisoned("batch delete"))?;
        Ok(tables.batch_delete(entity, field, ids))
    }

    fn commit(&self, ops: &[ChangeOp]) -> StoreResult<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::LockPoisoned("commit"))?;
        tables.apply(ops);
        Ok(())
    }
}

impl OpenStore for InMemoryStore {
    fn open_or_create(config: &CabinetConfig) -> StoreResult<Self> {
        if config.replication {
            return Err(StoreError::Unsupported(
                "in-memory store cannot replicate".into(),
            ));
        }
        Ok(Self::new())
    }
}
