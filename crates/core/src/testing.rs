//! In-memory [`QueryStore`] for tests.

use std::collections::BTreeSet;
use std::sync::Mutex;

use crate::query::SqlDialect;
use crate::store::{QueryStore, SqlParam, SqlRow, SqlValue, StoreError};

/// Answers tag lookups from a fixed catalog, returns canned rows for every
/// other query, and records each call.
#[derive(Default)]
pub struct RecordingStore {
    known_tags: BTreeSet<i64>,
    rows: Vec<SqlRow>,
    failure: Option<String>,
    dialect: SqlDialect,
    calls: Mutex<Vec<(String, Vec<SqlParam>)>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.known_tags.extend(ids);
        self
    }

    pub fn with_session_ids<'a>(self, ids: impl IntoIterator<Item = &'a str>) -> Self {
        self.with_rows(
            ids.into_iter()
                .map(|id| vec![SqlValue::Text(id.to_string())])
                .collect(),
        )
    }

    pub fn with_rows(mut self, rows: Vec<SqlRow>) -> Self {
        self.rows = rows;
        self
    }

    /// Every query fails with `message`.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn with_dialect(mut self, dialect: SqlDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn calls(&self) -> Vec<(String, Vec<SqlParam>)> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    fn record(&self, sql: &str, params: &[SqlParam]) -> Result<(), StoreError> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push((sql.to_string(), params.to_vec()));
        match &self.failure {
            Some(message) => Err(StoreError::backend(message.clone())),
            None => Ok(()),
        }
    }
}

impl QueryStore for RecordingStore {
    fn query_one(&self, sql: &str, params: &[SqlParam]) -> Result<Option<SqlRow>, StoreError> {
        self.record(sql, params)?;
        if sql.starts_with("SELECT id FROM tags") {
            return Ok(match params.first() {
                Some(SqlParam::Integer(id)) if self.known_tags.contains(id) => {
                    Some(vec![SqlValue::Integer(*id)])
                }
                _ => None,
            });
        }
        Ok(self.rows.first().cloned())
    }

    fn query_all(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<SqlRow>, StoreError> {
        self.record(sql, params)?;
        Ok(self.rows.clone())
    }

    fn dialect(&self) -> SqlDialect {
        self.dialect
    }
}
