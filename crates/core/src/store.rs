//! The narrow persistence interface the filter consumes.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::SqlDialect;

/// A positional `?` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlParam {
    Integer(i64),
    Text(String),
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl fmt::Display for SqlParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

/// A single column value read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Column values in select-list order.
pub type SqlRow = Vec<SqlValue>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(Box<dyn std::error::Error + Send + Sync>),

    #[error("cannot decode column {column}: expected {expected}, found {found}")]
    Decode {
        column: usize,
        expected: &'static str,
        found: &'static str,
    },
}

impl StoreError {
    pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Backend(err.into())
    }
}

/// Read access to an embedded relational store.
///
/// `sql` uses `?` placeholders; `params` binds them left to right.
pub trait QueryStore {
    fn query_one(&self, sql: &str, params: &[SqlParam]) -> Result<Option<SqlRow>, StoreError>;

    fn query_all(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<SqlRow>, StoreError>;

    /// How compound-select operands must be written for this engine.
    fn dialect(&self) -> SqlDialect {
        SqlDialect::Standard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_serialize_as_plain_numbers_and_strings() {
        let params = vec![SqlParam::from(1), SqlParam::from("abc")];
        assert_eq!(serde_json::to_string(&params).unwrap(), r#"[1,"abc"]"#);
    }

    #[test]
    fn value_accessors() {
        assert_eq!(SqlValue::Integer(4).as_integer(), Some(4));
        assert_eq!(SqlValue::Text("s1".into()).as_text(), Some("s1"));
        assert_eq!(SqlValue::Null.as_text(), None);
        assert_eq!(SqlValue::Blob(vec![1]).type_name(), "blob");
    }
}
