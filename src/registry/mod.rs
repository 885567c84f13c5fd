//! Record registry - entity schemas keyed by entity name.
//!
//! Schemas are registered once through [`RegistryBuilder`] and the resulting
//! [`Registry`] is read-only, so lookups need no locking.

mod schema;

use std::collections::HashMap;

use crate::error::{CabinetError, Result};
use crate::storable::Storable;

pub use schema::Schema;

/// Read-only map from entity name to schema.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    schemas: HashMap<String, Schema>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Look up the schema for an entity name.
    pub fn schema(&self, entity: &str) -> Result<&Schema> {
        self.schemas
            .get(entity)
            .ok_or_else(|| CabinetError::UnregisteredEntity(entity.to_string()))
    }

    /// Look up the schema registered for a record type.
    pub fn schema_for<R: Storable>(&self) -> Result<&Schema> {
        self.schema(R::ENTITY)
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.schemas.contains_key(entity)
    }

    /// Registered entity names, sorted.
    pub fn entities(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Collects schemas and validates them into a [`Registry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    schemas: Vec<Schema>,
}

impl RegistryBuilder {
    /// Register the schema declared by a record type.
    pub fn register<R: Storable>(self) -> Self {
        self.register_schema(R::schema())
    }

    /// Register a schema directly, e.g. for an entity with no Rust type.
    pub fn register_schema(mut self, schema: Schema) -> Self {
        self.schemas.push(schema);
        self
    }

    /// Validate and freeze the registry.
    ///
    /// Fails on duplicate entity names and on cascades naming entities that
    /// were never registered.
    pub fn build(self) -> Result<Registry> {
        let mut schemas = HashMap::with_capacity(self.schemas.len());
        for schema in self.schemas {
            let name = schema.entity_name().to_string();
            if schemas.contains_key(&name) {
                return Err(CabinetError::DuplicateEntity(name));
            }
            schemas.insert(name, schema);
        }

        for schema in schemas.values() {
            for cascade in schema.cascades() {
                if !schemas.contains_key(cascade) {
                    return Err(CabinetError::UnknownCascade {
                        entity: schema.entity_name().to_string(),
                        cascade: cascade.clone(),
                    });
                }
            }
        }

        Ok(Registry { schemas })
    }
}
