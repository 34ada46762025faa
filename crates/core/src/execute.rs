use crate::error::TagFilterError;
use crate::query::{build_tag_filter_query_strict_with, build_tag_filter_query_with, CompiledQuery};
use crate::store::{QueryStore, SqlRow, SqlValue, StoreError};
use crate::tag_filter::TagFilterExpression;

/// Runs compiled tag filters against a store and returns matching session ids.
pub struct TagFilterExecutor<'a, S: QueryStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: QueryStore + ?Sized> TagFilterExecutor<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Session ids in result-set order. Malformed subtrees are dropped; an
    /// expression that compiles to nothing matches every session.
    pub fn filtered_session_ids(
        &self,
        expr: &TagFilterExpression,
    ) -> Result<Vec<String>, TagFilterError> {
        let compiled = build_tag_filter_query_with(expr, self.store.dialect());
        self.run(compiled)
    }

    /// Like [`Self::filtered_session_ids`], but refuses malformed expressions
    /// before touching the store.
    pub fn filtered_session_ids_strict(
        &self,
        expr: &TagFilterExpression,
    ) -> Result<Vec<String>, TagFilterError> {
        let compiled = build_tag_filter_query_strict_with(expr, self.store.dialect())?;
        self.run(compiled)
    }

    fn run(&self, compiled: CompiledQuery) -> Result<Vec<String>, TagFilterError> {
        let sql = compiled.select_session_ids();
        tracing::debug!(%sql, params = ?compiled.params, "running tag filter");

        let ids: Result<Vec<String>, StoreError> = self
            .store
            .query_all(&sql, &compiled.params)
            .and_then(|rows| rows.iter().map(session_id_from_row).collect());

        ids.map_err(|source| {
            tracing::error!(%sql, params = ?compiled.params, error = %source, "tag filter query failed");
            TagFilterError::Query {
                sql,
                params: compiled.params,
                source,
            }
        })
    }
}

pub fn get_filtered_session_ids<S: QueryStore + ?Sized>(
    store: &S,
    expr: &TagFilterExpression,
) -> Result<Vec<String>, TagFilterError> {
    TagFilterExecutor::new(store).filtered_session_ids(expr)
}

fn session_id_from_row(row: &SqlRow) -> Result<String, StoreError> {
    match row.first() {
        Some(SqlValue::Text(id)) => Ok(id.clone()),
        Some(SqlValue::Integer(id)) => Ok(id.to_string()),
        other => Err(StoreError::Decode {
            column: 0,
            expected: "text",
            found: other.map_or("nothing", SqlValue::type_name),
        }),
    }
}
