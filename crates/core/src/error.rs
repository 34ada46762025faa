use thiserror::Error;

use crate::store::{SqlParam, StoreError};

/// A node that would silently drop out of a lenient compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CompileError {
    #[error("tag node at {path} has no usable tagId")]
    MissingTagId { path: String },

    #[error("{kind} node at {path} has no children")]
    EmptyChildren { kind: &'static str, path: String },
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TagFilterError {
    #[error("invalid tag filter: {0}")]
    Compile(#[from] CompileError),

    #[error("tag filter query failed: {sql}")]
    Query {
        sql: String,
        params: Vec<SqlParam>,
        #[source]
        source: StoreError,
    },

    #[error("lookup of tag {tag_id} failed")]
    Lookup {
        tag_id: i64,
        #[source]
        source: StoreError,
    },
}
