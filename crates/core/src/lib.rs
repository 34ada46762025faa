//! Tag-filter expressions over the session catalog.
//!
//! An expression tree (AND / OR / NOT over tag predicates) is lowered into a
//! single SQL subquery built from `INTERSECT`, `UNION` and `EXCEPT`, then run
//! against any [`QueryStore`].

pub mod error;
pub mod execute;
pub mod query;
pub mod store;
pub mod tag_filter;
pub mod validate;

pub use error::{CompileError, TagFilterError};
pub use execute::{get_filtered_session_ids, TagFilterExecutor};
pub use query::{
    build_tag_filter_query, build_tag_filter_query_strict, compile_subquery, CompiledQuery,
    SqlDialect,
};
pub use store::{QueryStore, SqlParam, SqlRow, SqlValue, StoreError};
pub use tag_filter::TagFilterExpression;
pub use validate::{validate_tag_ids, TagFilterValidator, TagValidation};

#[cfg(any(test, feature = "testing"))]
pub mod testing;
