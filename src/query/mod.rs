//! Query model - predicate filters and sort order over rows.
//!
//! A [`Query`] is a conjunction of field conditions plus an ordered list of
//! sort keys. It is built per call and carries no state.
//!
//! ## Example
//!
//! ```ignore
//! use cabinet::{Predicate, Query, SortOrder};
//!
//! let query = Query::filter(Predicate::all().eq("status", "open").gt("total", 100))
//!     .sort_by("total", SortOrder::Descending)
//!     .limit(10);
//! ```

mod eval;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub use eval::{compare_values, sort_rows};

/// Comparison applied by a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Field value is one of the values in an array.
    In,
    /// Substring for strings, membership for arrays.
    Contains,
}

/// A single `field <op> value` test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }
}

/// Conjunction of conditions. An empty predicate matches every row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    conditions: Vec<Condition>,
}

impl Predicate {
    /// Match-all predicate.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Condition::new(field, Operator::Eq, value))
    }

    pub fn ne(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Condition::new(field, Operator::Ne, value))
    }

    pub fn lt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Condition::new(field, Operator::Lt, value))
    }

    pub fn le(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Condition::new(field, Operator::Le, value))
    }

    pub fn gt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Condition::new(field, Operator::Gt, value))
    }

    pub fn ge(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Condition::new(field, Operator::Ge, value))
    }

    pub fn is_in<V: Into<Value>>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.and(Condition::new(field, Operator::In, Value::Array(values)))
    }

    /// `field IN ids`, with identifiers in their stored string form.
    pub fn in_ids<'a>(self, field: impl Into<String>, ids: impl IntoIterator<Item = &'a Uuid>) -> Self {
        self.is_in(field, ids.into_iter().map(|id| id.to_string()))
    }

    pub fn contains(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.and(Condition::new(field, Operator::Contains, value))
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_match_all(&self) -> bool {
        self.conditions.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// One level of ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub order: SortOrder,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Descending,
        }
    }
}

/// Predicate plus sort keys plus optional limit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    predicate: Predicate,
    sort: Vec<SortKey>,
    limit: Option<usize>,
}

impl Query {
    /// Match every row in store order.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filter(predicate: Predicate) -> Self {
        Self {
            predicate,
            ..Self::default()
        }
    }

    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push(SortKey {
            field: field.into(),
            order,
        });
        self
    }

    pub fn with_sort(mut self, keys: impl IntoIterator<Item = SortKey>) -> Self {
        self.sort.extend(keys);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn sort_keys(&self) -> &[SortKey] {
        &self.sort
    }

    pub fn max_rows(&self) -> Option<usize> {
        self.limit
    }
}
