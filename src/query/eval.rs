use std::cmp::Ordering;

use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::storable::Row;

use super::{Condition, Operator, Predicate, SortKey, SortOrder};

static NULL: Value = Value::Null;

impl Predicate {
    /// Reject predicates the evaluator cannot execute.
    pub fn validate(&self) -> StoreResult<()> {
        for condition in &self.conditions {
            if condition.field.is_empty() {
                return Err(StoreError::Query("condition with empty field name".into()));
            }
            if condition.op == Operator::In && !condition.value.is_array() {
                return Err(StoreError::Query(format!(
                    "IN on `{}` requires an array of values",
                    condition.field
                )));
            }
        }
        Ok(())
    }

    /// Whether every condition holds for `row`. Missing fields read as null.
    pub fn matches(&self, row: &Row) -> bool {
        self.conditions.iter().all(|c| c.matches(row))
    }
}

impl Condition {
    pub fn matches(&self, row: &Row) -> bool {
        let actual = row.get(&self.field).unwrap_or(&NULL);
        let ordering = || compare_values(actual, &self.value);

        match self.op {
            Operator::Eq => values_equal(actual, &self.value),
            Operator::Ne => !values_equal(actual, &self.value),
            Operator::Lt => ordering() == Some(Ordering::Less),
            Operator::Le => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
            Operator::Gt => ordering() == Some(Ordering::Greater),
            Operator::Ge => matches!(ordering(), Some(Ordering::Greater | Ordering::Equal)),
            Operator::In => match &self.value {
                Value::Array(candidates) => candidates.iter().any(|c| values_equal(actual, c)),
                _ => false,
            },
            Operator::Contains => match (actual, &self.value) {
                (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_str()),
                (Value::Array(items), needle) => items.iter().any(|i| values_equal(i, needle)),
                _ => false,
            },
        }
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Compare two scalar values of the same kind.
///
/// Numbers compare numerically regardless of integer/float representation.
/// Values of different kinds, arrays and objects are incomparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::Number(y)) => {
            match (x.as_i64(), y.as_i64()) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
            }
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match compare_values(a, b) {
        Some(ordering) => ordering == Ordering::Equal,
        None => a == b,
    }
}

/// Total order used for sorting: null < bool < number < string < array < object.
fn sort_order(a: &Value, b: &Value) -> Ordering {
    compare_values(a, b).unwrap_or_else(|| rank(a).cmp(&rank(b)))
}

/// Stable sort by `keys` in sequence; ties keep their incoming order.
pub fn sort_rows(rows: &mut [Row], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }

    rows.sort_by(|a, b| {
        for key in keys {
            let left = a.get(&key.field).unwrap_or(&NULL);
            let right = b.get(&key.field).unwrap_or(&NULL);
            let ordering = match key.order {
                SortOrder::Ascending => sort_order(left, right),
                SortOrder::Descending => sort_order(right, left),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}
