//! Conversions between query-builder, filter and SQLite values.

use rusqlite::types::{Value, ValueRef};
use sessiondeck_core::{SqlParam, SqlRow, SqlValue};

/// Convert `sea_query::Values` into owned SQLite bind params.
pub fn from_sea_values(values: &sea_query::Values) -> Vec<Value> {
    values
        .0
        .iter()
        .map(|v| match v {
            sea_query::Value::Bool(Some(b)) => Value::Integer(i64::from(*b)),
            sea_query::Value::Int(Some(i)) => Value::Integer(i64::from(*i)),
            sea_query::Value::BigInt(Some(i)) => Value::Integer(*i),
            sea_query::Value::Double(Some(f)) => Value::Real(*f),
            sea_query::Value::String(Some(s)) => Value::Text(s.to_string()),
            sea_query::Value::Bytes(Some(b)) => Value::Blob(b.to_vec()),
            _ => Value::Null,
        })
        .collect()
}

pub fn from_params(params: &[SqlParam]) -> Vec<Value> {
    params
        .iter()
        .map(|p| match p {
            SqlParam::Integer(i) => Value::Integer(*i),
            SqlParam::Text(s) => Value::Text(s.clone()),
        })
        .collect()
}

pub fn read_row(row: &rusqlite::Row<'_>, columns: usize) -> rusqlite::Result<SqlRow> {
    (0..columns)
        .map(|idx| {
            row.get_ref(idx).map(|value| match value {
                ValueRef::Null => SqlValue::Null,
                ValueRef::Integer(n) => SqlValue::Integer(n),
                ValueRef::Real(f) => SqlValue::Real(f),
                ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
                ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
            })
        })
        .collect()
}
