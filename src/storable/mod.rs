//! Storable - the contract a record type fulfils to live in the store.
//!
//! A record maps to and from a [`Row`], the store's generic representation:
//! a JSON object keyed by field name. The default mapping goes through
//! `serde_json`, so most types only need `Serialize + Deserialize` and the
//! `Storable` derive.
//!
//! ## Example
//!
//! ```ignore
//! use cabinet::{Storable, Uuid};
//!
//! #[derive(Clone, Serialize, Deserialize, Storable)]
//! #[storable(entity = "Invoice", foreign_key = "invoice_id", cascade = "LineItem")]
//! struct Invoice {
//!     id: Uuid,
//!     number: String,
//! }
//! ```

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

use crate::registry::Schema;

/// Generic row representation used by the backing store.
pub type Row = Map<String, Value>;

/// Trait for record types that can be stored.
pub trait Storable: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Entity name; maps to a table or collection in the backing store.
    const ENTITY: &'static str;

    /// Globally unique identifier of this record. Immutable after creation.
    fn id(&self) -> Uuid;

    /// Schema registered for this type.
    fn schema() -> Schema {
        Schema::new(Self::ENTITY)
    }

    /// Convert this record into a row.
    fn to_row(&self) -> Row {
        to_row(self)
    }

    /// Build a record from a row. Returns `None` when required fields are
    /// absent or malformed.
    fn from_row(row: &Row) -> Option<Self> {
        from_row(row)
    }

    /// Overwrite the fields present on this record onto `row`, leaving every
    /// other field of the row untouched.
    fn apply_fields(&self, row: &mut Row) {
        merge_fields(self.to_row(), row);
    }
}

/// Serialize any value into a row.
///
/// Values that fail to serialize or are not JSON objects produce an empty
/// row, which carries no identifier and is rejected by insert and update.
pub fn to_row<T: Serialize + ?Sized>(value: &T) -> Row {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            warn!(kind = value_kind(&other), "value does not serialize to an object");
            Row::new()
        }
        Err(err) => {
            warn!(error = %err, "value failed to serialize");
            Row::new()
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Deserialize a row into `T`, returning `None` on any mismatch.
pub fn from_row<T: DeserializeOwned>(row: &Row) -> Option<T> {
    serde_json::from_value(Value::Object(row.clone())).ok()
}

/// Copy every field of `fields` onto `row`.
pub fn merge_fields(fields: Row, row: &mut Row) {
    for (key, value) in fields {
        row.insert(key, value);
    }
}

/// Read a UUID stored under `field`.
pub fn row_uuid(row: &Row, field: &str) -> Option<Uuid> {
    row.get(field)
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
}
