use std::collections::HashMap;

use tracing::{debug, warn};
use uuid::Uuid;

use super::StoreContext;
use crate::config::CascadeMode;
use crate::error::{CabinetError, Result};
use crate::query::{Predicate, Query};
use crate::registry::Schema;
use crate::storable::{row_uuid, Row, Storable};
use crate::store::{BackingStore, ChangeOp};

impl<B: BackingStore> StoreContext<B> {
    /// Stage `record` for the next save.
    ///
    /// Staging an identifier that already exists replaces that record.
    pub fn insert<R: Storable>(&self, record: &R) -> Result<bool> {
        let schema = self.registry.schema_for::<R>()?;
        let row = record_row(schema, record)?;
        self.lock_buffer("insert")?
            .stage_upsert(schema.entity_name(), record.id(), row);
        debug!(entity = schema.entity_name(), id = %record.id(), "staged insert");
        Ok(true)
    }

    /// Merge the fields present on each record into its stored row and stage
    /// the result.
    ///
    /// Stored fields the records do not carry are preserved. Records whose
    /// identifier matches nothing are skipped; if nothing matches at all the
    /// call is a no-op returning `false`.
    pub fn update<R: Storable>(&self, records: &[R]) -> Result<bool> {
        let schema = self.registry.schema_for::<R>()?;
        let mut by_id: HashMap<Uuid, &R> = HashMap::with_capacity(records.len());
        for record in records {
            record_row(schema, record)?;
            by_id.insert(record.id(), record);
        }

        let query = Query::filter(Predicate::all().in_ids(schema.primary_key(), by_id.keys()));
        let rows = self.fetch_rows(schema, &query)?;
        if rows.is_empty() {
            debug!(entity = schema.entity_name(), "update matched no rows");
            return Ok(false);
        }

        let mut buffer = self.lock_buffer("update")?;
        let mut merged = 0;
        for row in rows {
            let Some(id) = row_uuid(&row, schema.primary_key()) else {
                continue;
            };
            let Some(record) = by_id.remove(&id) else {
                continue;
            };
            // Restaged since the read: merge onto the newer row.
            let mut row = buffer
                .staged_row(schema.entity_name(), &id)
                .cloned()
                .unwrap_or(row);
            record.apply_fields(&mut row);
            buffer.stage_upsert(schema.entity_name(), id, row);
            merged += 1;
        }

        debug!(entity = schema.entity_name(), merged, "staged update");
        Ok(true)
    }

    /// Delete `records` and every row registered to cascade from them.
    ///
    /// Deletion works on the identifiers of the given records as passed in.
    /// See [`CascadeMode`] for how failures part-way through behave.
    pub fn delete<R: Storable>(&self, records: &[R]) -> Result<bool> {
        let ids: Vec<Uuid> = records.iter().map(|r| r.id()).collect();
        self.delete_ids(R::ENTITY, &ids)
    }

    /// Delete rows of `entity` by identifier, cascading into dependents.
    pub fn delete_ids(&self, entity: &str, ids: &[Uuid]) -> Result<bool> {
        let schema = self.registry.schema(entity)?;
        let _writer = self.lock_writer("delete")?;
        match self.config.cascade_mode {
            CascadeMode::Sequential => self.delete_sequential(schema, ids),
            CascadeMode::Atomic => self.delete_atomic(schema, ids),
        }
    }

    /// Parent batch delete, then one batch delete per cascade entity.
    ///
    /// Each step is durable on its own. A failing child step stops the chain
    /// and reports `PartialCascadeFailure`; earlier steps are not rolled back.
    fn delete_sequential(&self, schema: &Schema, ids: &[Uuid]) -> Result<bool> {
        let entity = schema.entity_name();

        let removed = self
            .store
            .batch_delete(entity, schema.primary_key(), ids)
            .map_err(CabinetError::CommitFailed)?;
        self.lock_buffer("delete")?
            .purge(entity, schema.primary_key(), ids);
        debug!(entity, removed, "batch deleted");

        for cascade in schema.cascades() {
            let removed = self
                .store
                .batch_delete(cascade, schema.foreign_key(), ids)
                .map_err(|source| {
                    warn!(parent = entity, entity = %cascade, error = %source, "cascade delete stopped part-way");
                    CabinetError::PartialCascadeFailure {
                        entity: cascade.clone(),
                        source,
                    }
                })?;
            self.lock_buffer("delete")?
                .purge(cascade, schema.foreign_key(), ids);
            debug!(parent = entity, entity = %cascade, removed, "cascade deleted");
        }

        Ok(true)
    }

    /// Parent and dependent rows removed by a single commit.
    ///
    /// Dependents are resolved before anything is written, so a failure
    /// leaves every row in place.
    fn delete_atomic(&self, schema: &Schema, ids: &[Uuid]) -> Result<bool> {
        let entity = schema.entity_name();

        let mut doomed: Vec<(String, Vec<Uuid>)> = vec![(entity.to_string(), ids.to_vec())];
        for cascade in schema.cascades() {
            let child = self.registry.schema(cascade)?;
            let query = Query::filter(Predicate::all().in_ids(schema.foreign_key(), ids));
            let child_ids: Vec<Uuid> = self
                .fetch_rows(child, &query)?
                .iter()
                .filter_map(|row| row_uuid(row, child.primary_key()))
                .collect();
            doomed.push((cascade.clone(), child_ids));
        }

        let ops: Vec<ChangeOp> = doomed
            .iter()
            .flat_map(|(entity, ids)| {
                ids.iter().map(move |id| ChangeOp::Delete {
                    entity: entity.clone(),
                    id: *id,
                })
            })
            .collect();

        self.store
            .commit(&ops)
            .map_err(CabinetError::CommitFailed)?;

        let mut buffer = self.lock_buffer("delete")?;
        buffer.forget(entity, ids);
        for cascade in schema.cascades() {
            buffer.purge(cascade, schema.foreign_key(), ids);
        }

        debug!(entity, rows = ops.len(), "atomically deleted with cascades");
        Ok(true)
    }
}

/// The row for `record`, which must carry the record's identifier under the
/// schema's primary key.
fn record_row<R: Storable>(schema: &Schema, record: &R) -> Result<Row> {
    let row = record.to_row();
    if row_uuid(&row, schema.primary_key()) == Some(record.id()) {
        return Ok(row);
    }

    warn!(
        entity = schema.entity_name(),
        id = %record.id(),
        primary_key = schema.primary_key(),
        "record row does not carry its identifier under the primary key"
    );
    Err(CabinetError::Mapping {
        entity: schema.entity_name().to_string(),
        id: Some(record.id()),
    })
}
