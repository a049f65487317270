//! Row representation shared by the evaluator, the orchestrator and both backends.

use serde_json::{Map, Value};

/// One record: field name -> value. Always carries an integer `id` once stored.
pub type Row = Map<String, Value>;

pub type RowId = i64;

pub fn row_id(row: &Row) -> Option<RowId> {
    row.get(crate::config::ID_FIELD).and_then(Value::as_i64)
}

pub fn set_row_id(row: &mut Row, id: RowId) {
    row.insert(crate::config::ID_FIELD.to_string(), Value::Number(id.into()));
}

/// Type-sensitive equality where integer and float JSON numbers compare numerically.
pub fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => match (n.as_i64(), m.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => n.as_f64() == m.as_f64(),
        },
        _ => a == b,
    }
}
