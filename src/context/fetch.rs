use tracing::{debug, warn};

use super::StoreContext;
use crate::config::MappingPolicy;
use crate::error::{CabinetError, Result};
use crate::query::{sort_rows, Query};
use crate::registry::Schema;
use crate::storable::{row_uuid, Row, Storable};
use crate::store::BackingStore;

impl<B: BackingStore> StoreContext<B> {
    /// Typed records of `R` matching `query`, staged changes included.
    ///
    /// An empty match is an empty vector. Rows that do not map into `R` are
    /// dropped under [`MappingPolicy::Lenient`] and fail the fetch under
    /// [`MappingPolicy::Strict`].
    pub fn fetch<R: Storable>(&self, query: &Query) -> Result<Vec<R>> {
        let schema = self.registry.schema_for::<R>()?;
        let rows = self.fetch_rows(schema, query)?;
        self.map_rows(schema, rows)
    }

    /// Untyped rows of `entity` matching `query`, staged changes included.
    pub fn rows(&self, entity: &str, query: &Query) -> Result<Vec<Row>> {
        let schema = self.registry.schema(entity)?;
        self.fetch_rows(schema, query)
    }

    /// Staged rows are copied out before the store is queried; the buffer is
    /// not locked while the store runs.
    pub(super) fn fetch_rows(&self, schema: &Schema, query: &Query) -> Result<Vec<Row>> {
        let entity = schema.entity_name();
        let predicate = query.predicate();
        predicate.validate().map_err(CabinetError::FetchFailed)?;

        let staged = self.lock_buffer("fetch")?.staged(entity);
        let committed = self
            .store
            .query(entity, predicate)
            .map_err(CabinetError::FetchFailed)?;
        let mut rows = staged.overlay(schema.primary_key(), committed, predicate);

        sort_rows(&mut rows, query.sort_keys());
        if let Some(limit) = query.max_rows() {
            rows.truncate(limit);
        }

        debug!(entity, rows = rows.len(), "fetched rows");
        Ok(rows)
    }

    fn map_rows<R: Storable>(&self, schema: &Schema, rows: Vec<Row>) -> Result<Vec<R>> {
        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            match R::from_row(row) {
                Some(record) => records.push(record),
                None => {
                    let id = row_uuid(row, schema.primary_key());
                    match self.config.mapping_policy {
                        MappingPolicy::Lenient => {
                            warn!(entity = schema.entity_name(), ?id, "dropping unmappable row");
                        }
                        MappingPolicy::Strict => {
                            return Err(CabinetError::Mapping {
                                entity: schema.entity_name().to_string(),
                                id,
                            });
                        }
                    }
                }
            }
        }
        Ok(records)
    }
}
