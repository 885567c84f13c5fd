use std::collections::{BTreeMap, HashMap, HashSet};

use uuid::Uuid;

use crate::query::Predicate;
use crate::storable::{row_uuid, Row};
use crate::store::ChangeOp;

/// Uncommitted upserts since the last successful save, keyed by entity and id.
///
/// Staging the same record twice keeps only the latest row. Deletes write
/// through and never appear here.
#[derive(Debug, Default)]
pub(crate) struct ChangeBuffer {
    pending: HashMap<String, BTreeMap<Uuid, Row>>,
}

impl ChangeBuffer {
    pub(crate) fn is_empty(&self) -> bool {
        self.pending.values().all(BTreeMap::is_empty)
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.values().map(BTreeMap::len).sum()
    }

    pub(crate) fn stage_upsert(&mut self, entity: &str, id: Uuid, row: Row) {
        self.pending
            .entry(entity.to_string())
            .or_default()
            .insert(id, row);
    }

    /// Copy of the rows staged for `entity`, for use once the lock is released.
    pub(crate) fn staged(&self, entity: &str) -> Staged {
        Staged(self.pending.get(entity).cloned().unwrap_or_default())
    }

    /// The row currently staged for one record.
    pub(crate) fn staged_row(&self, entity: &str, id: &Uuid) -> Option<&Row> {
        self.pending.get(entity).and_then(|staged| staged.get(id))
    }

    /// Drop staged rows of `entity` whose `field` holds one of `ids`.
    ///
    /// Used after a durable batch delete so the removed rows are not
    /// resurrected by the next save.
    pub(crate) fn purge(&mut self, entity: &str, field: &str, ids: &[Uuid]) -> usize {
        let Some(staged) = self.pending.get_mut(entity) else {
            return 0;
        };
        let targets: HashSet<&Uuid> = ids.iter().collect();
        let before = staged.len();
        staged.retain(|_, row| {
            !row_uuid(row, field)
                .map(|value| targets.contains(&value))
                .unwrap_or(false)
        });
        before - staged.len()
    }

    /// Drop every staged change for the given records.
    pub(crate) fn forget(&mut self, entity: &str, ids: &[Uuid]) {
        if let Some(staged) = self.pending.get_mut(entity) {
            for id in ids {
                staged.remove(id);
            }
        }
    }

    pub(crate) fn ops(&self) -> Vec<ChangeOp> {
        let mut ops = Vec::with_capacity(self.len());
        for (entity, staged) in &self.pending {
            for (id, row) in staged {
                ops.push(ChangeOp::Upsert {
                    entity: entity.clone(),
                    id: *id,
                    row: row.clone(),
                });
            }
        }
        ops
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
    }

    /// Drop the upserts that `ops` committed, keeping any row restaged with
    /// different content while the commit was in flight.
    pub(crate) fn settle(&mut self, ops: &[ChangeOp]) {
        for op in ops {
            if let ChangeOp::Upsert { entity, id, row } = op {
                if let Some(staged) = self.pending.get_mut(entity) {
                    if staged.get(id) == Some(row) {
                        staged.remove(id);
                    }
                }
            }
        }
        self.pending.retain(|_, staged| !staged.is_empty());
    }
}

/// Staged rows of one entity, detached from the buffer.
#[derive(Debug, Default)]
pub(crate) struct Staged(BTreeMap<Uuid, Row>);

impl Staged {
    /// Layer the staged rows over committed `rows`.
    ///
    /// Committed rows with a staged counterpart are replaced by it; staged
    /// rows are kept only if they satisfy `predicate`.
    pub(crate) fn overlay(self, primary_key: &str, rows: Vec<Row>, predicate: &Predicate) -> Vec<Row> {
        if self.0.is_empty() {
            return rows;
        }

        let mut merged: Vec<Row> = rows
            .into_iter()
            .filter(|row| match row_uuid(row, primary_key) {
                Some(id) => !self.0.contains_key(&id),
                None => true,
            })
            .collect();

        merged.extend(
            self.0
                .into_values()
                .filter(|row| predicate.matches(row)),
        );
        merged
    }
}
