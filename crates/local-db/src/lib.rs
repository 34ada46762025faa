pub mod tables;
pub mod tags;
pub mod values;

use anyhow::{Context, Result};
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use sea_query::{Expr, OnConflict, Order, Query, SelectStatement, SqliteQueryBuilder};
use sessiondeck_core::{
    get_filtered_session_ids, validate_tag_ids, QueryStore, SqlDialect, SqlParam, SqlRow,
    StoreError, TagFilterError, TagFilterExecutor, TagFilterExpression, TagValidation,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tables::Sessions;

pub use tags::{Tag, DEFAULT_TAG_COLOR};

/// A statement from the query builder plus its bind values.
pub type Built = (String, sea_query::Values);

/// A named migration: `(name, sql)`.
pub type Migration = (&'static str, &'static str);

pub const MIGRATIONS: &[Migration] = &[(
    "0001_schema",
    include_str!("../migrations/0001_schema.sql"),
)];

/// A session in the local catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRow {
    pub id: String,
    pub title: Option<String>,
    pub project: Option<String>,
    pub created_at: String,
}

impl SessionRow {
    pub fn new(id: impl Into<String>, created_at: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            project: None,
            created_at: created_at.into(),
        }
    }
}

/// Local SQLite database holding sessions, tags and their associations.
/// Thread-safe: wraps the connection in a Mutex so it can be shared via `Arc<LocalDb>`.
pub struct LocalDb {
    conn: Mutex<Connection>,
}

impl LocalDb {
    /// Open (or create) the local database at the default path.
    /// `~/.local/share/sessiondeck/local.db`
    pub fn open() -> Result<Self> {
        let path = default_db_path()?;
        Self::open_path(&path)
    }

    /// Open (or create) the local database at a specific path.
    pub fn open_path(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir for {}", path.display()))?;
        }
        let conn =
            Connection::open(path).with_context(|| format!("open db {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory db")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("local db mutex poisoned")
    }

    pub(crate) fn execute_built(&self, (sql, binds): &Built) -> rusqlite::Result<usize> {
        self.conn()
            .execute(sql, params_from_iter(values::from_sea_values(binds)))
    }

    pub(crate) fn query_built<T, F>(&self, (sql, binds): &Built, map: F) -> Result<Vec<T>>
    where
        F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(values::from_sea_values(binds)), map)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub(crate) fn query_built_optional<T, F>(&self, (sql, binds): &Built, map: F) -> Result<Option<T>>
    where
        F: FnOnce(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    {
        let row = self
            .conn()
            .query_row(sql, params_from_iter(values::from_sea_values(binds)), map)
            .optional()?;
        Ok(row)
    }

    // ── Sessions ───────────────────────────────────────────────────────

    pub fn upsert_session(&self, session: &SessionRow) -> Result<()> {
        self.execute_built(&session_upsert(session))
            .with_context(|| format!("upsert session {}", session.id))?;
        Ok(())
    }

    pub fn get_session(&self, id: &str) -> Result<Option<SessionRow>> {
        self.query_built_optional(&session_by_id(id), row_to_session)
    }

    /// All sessions, newest first.
    pub fn list_sessions(&self) -> Result<Vec<SessionRow>> {
        self.query_built(&session_list(), row_to_session)
    }

    /// Delete a session and its tag associations.
    pub fn delete_session(&self, id: &str) -> Result<bool> {
        let changed = self
            .execute_built(&session_delete(id))
            .with_context(|| format!("delete session {id}"))?;
        Ok(changed > 0)
    }

    // ── Tag filters ────────────────────────────────────────────────────

    /// Ids of sessions matching `expr`; malformed subtrees are dropped.
    pub fn filter_sessions(
        &self,
        expr: &TagFilterExpression,
    ) -> std::result::Result<Vec<String>, TagFilterError> {
        get_filtered_session_ids(self, expr)
    }

    /// Ids of sessions matching `expr`; malformed expressions are refused.
    pub fn filter_sessions_strict(
        &self,
        expr: &TagFilterExpression,
    ) -> std::result::Result<Vec<String>, TagFilterError> {
        TagFilterExecutor::new(self).filtered_session_ids_strict(expr)
    }

    pub fn validate_tag_filter(
        &self,
        expr: &TagFilterExpression,
    ) -> std::result::Result<TagValidation, TagFilterError> {
        validate_tag_ids(self, expr)
    }
}

impl QueryStore for LocalDb {
    fn query_one(
        &self,
        sql: &str,
        params: &[SqlParam],
    ) -> std::result::Result<Option<SqlRow>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql).map_err(StoreError::backend)?;
        let columns = stmt.column_count();
        stmt.query_row(params_from_iter(values::from_params(params)), |row| {
            values::read_row(row, columns)
        })
        .optional()
        .map_err(StoreError::backend)
    }

    fn query_all(
        &self,
        sql: &str,
        params: &[SqlParam],
    ) -> std::result::Result<Vec<SqlRow>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql).map_err(StoreError::backend)?;
        let columns = stmt.column_count();
        let rows = stmt
            .query_map(params_from_iter(values::from_params(params)), |row| {
                values::read_row(row, columns)
            })
            .map_err(StoreError::backend)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row.map_err(StoreError::backend)?);
        }
        Ok(result)
    }

    fn dialect(&self) -> SqlDialect {
        SqlDialect::Sqlite
    }
}

fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if !already_applied {
            conn.execute_batch(sql)
                .with_context(|| format!("apply migration {name}"))?;
            conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])?;
            tracing::debug!(migration = *name, "applied migration");
        }
    }
    Ok(())
}

fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<SessionRow> {
    Ok(SessionRow {
        id: row.get(0)?,
        title: row.get(1)?,
        project: row.get(2)?,
        created_at: row.get(3)?,
    })
}

// ── Session query builders ─────────────────────────────────────────────────

/// Column order must match `row_to_session()`.
fn session_select() -> SelectStatement {
    Query::select()
        .columns([
            Sessions::Id,
            Sessions::Title,
            Sessions::Project,
            Sessions::CreatedAt,
        ])
        .from(Sessions::Table)
        .to_owned()
}

/// `created_at` is kept from the first insert.
fn session_upsert(session: &SessionRow) -> Built {
    Query::insert()
        .into_table(Sessions::Table)
        .columns([
            Sessions::Id,
            Sessions::Title,
            Sessions::Project,
            Sessions::CreatedAt,
        ])
        .values_panic([
            session.id.as_str().into(),
            session.title.clone().into(),
            session.project.clone().into(),
            session.created_at.as_str().into(),
        ])
        .on_conflict(
            OnConflict::column(Sessions::Id)
                .update_columns([Sessions::Title, Sessions::Project])
                .to_owned(),
        )
        .build(SqliteQueryBuilder)
}

fn session_by_id(id: &str) -> Built {
    session_select()
        .and_where(Expr::col(Sessions::Id).eq(id))
        .build(SqliteQueryBuilder)
}

fn session_list() -> Built {
    session_select()
        .order_by(Sessions::CreatedAt, Order::Desc)
        .order_by(Sessions::Id, Order::Asc)
        .build(SqliteQueryBuilder)
}

fn session_delete(id: &str) -> Built {
    Query::delete()
        .from_table(Sessions::Table)
        .and_where(Expr::col(Sessions::Id).eq(id))
        .build(SqliteQueryBuilder)
}

pub fn default_db_path() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Could not determine home directory")?;
    Ok(PathBuf::from(home)
        .join(".local")
        .join("share")
        .join("sessiondeck")
        .join("local.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use TagFilterExpression as E;

    fn test_db() -> (tempfile::TempDir, LocalDb) {
        let dir = tempfile::tempdir().unwrap();
        let db = LocalDb::open_path(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    /// s1: rust, bug   s2: rust   s3: bug, docs   s4: (none)
    fn seeded() -> (LocalDb, i64, i64, i64) {
        let db = LocalDb::open_in_memory().unwrap();
        for (i, id) in ["s1", "s2", "s3", "s4"].iter().enumerate() {
            db.upsert_session(&SessionRow::new(*id, format!("2024-01-0{}T00:00:00Z", i + 1)))
                .unwrap();
        }
        let rust = db.create_tag("rust", None).unwrap().id;
        let bug = db.create_tag("bug", None).unwrap().id;
        let docs = db.create_tag("docs", None).unwrap().id;
        for (session, tag) in [("s1", rust), ("s1", bug), ("s2", rust), ("s3", bug), ("s3", docs)] {
            db.add_tag_to_session(session, tag).unwrap();
        }
        (db, rust, bug, docs)
    }

    fn sorted(mut ids: Vec<String>) -> Vec<String> {
        ids.sort();
        ids
    }

    #[test]
    fn test_open_and_schema() {
        let (_dir, db) = test_db();
        assert!(db.list_sessions().unwrap().is_empty());
    }

    #[test]
    fn test_migrations_run_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("again.db");
        LocalDb::open_path(&path).unwrap();
        let db = LocalDb::open_path(&path).unwrap();
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as i64);
    }

    #[test]
    fn test_session_upsert_and_list() {
        let (_dir, db) = test_db();
        let mut older = SessionRow::new("a", "2024-01-01T00:00:00Z");
        db.upsert_session(&older).unwrap();
        db.upsert_session(&SessionRow::new("b", "2024-02-01T00:00:00Z"))
            .unwrap();

        older.title = Some("renamed".to_string());
        db.upsert_session(&older).unwrap();

        let ids: Vec<String> = db.list_sessions().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(db.get_session("a").unwrap().unwrap().title.as_deref(), Some("renamed"));
        assert!(db.delete_session("a").unwrap());
        assert_eq!(db.get_session("a").unwrap(), None);
    }

    #[test]
    fn test_session_upsert_keeps_created_at() {
        let (sql, _) = session_upsert(&SessionRow::new("a", "2024-01-01T00:00:00Z"));
        assert!(sql.starts_with(r#"INSERT INTO "sessions""#), "{sql}");
        assert!(sql.contains(r#"ON CONFLICT ("id") DO UPDATE SET"#), "{sql}");
        assert!(!sql.contains(r#""created_at" = "excluded"."created_at""#), "{sql}");

        let db = LocalDb::open_in_memory().unwrap();
        db.upsert_session(&SessionRow::new("a", "2024-01-01T00:00:00Z"))
            .unwrap();
        db.upsert_session(&SessionRow::new("a", "2030-01-01T00:00:00Z"))
            .unwrap();
        let session = db.get_session("a").unwrap().unwrap();
        assert_eq!(session.created_at, "2024-01-01T00:00:00Z");
        assert_eq!(session.title, None);
    }

    #[test]
    fn test_filter_single_tag() {
        let (db, rust, _, _) = seeded();
        assert_eq!(sorted(db.filter_sessions(&E::tag(rust)).unwrap()), vec!["s1", "s2"]);
    }

    #[test]
    fn test_filter_and_or_not() {
        let (db, rust, bug, docs) = seeded();

        let both = E::and([E::tag(rust), E::tag(bug)]);
        assert_eq!(db.filter_sessions(&both).unwrap(), vec!["s1"]);

        let either = E::or([E::tag(rust), E::tag(docs)]);
        assert_eq!(sorted(db.filter_sessions(&either).unwrap()), vec!["s1", "s2", "s3"]);

        let untagged_rust = E::not(E::tag(rust));
        assert_eq!(sorted(db.filter_sessions(&untagged_rust).unwrap()), vec!["s3", "s4"]);

        let rust_not_bug = E::and([E::tag(rust), E::not(E::tag(bug))]);
        assert_eq!(db.filter_sessions(&rust_not_bug).unwrap(), vec!["s2"]);
    }

    #[test]
    fn test_filter_nested_grouping() {
        let (db, rust, bug, docs) = seeded();
        // (rust OR docs) AND bug
        let expr = E::and([E::or([E::tag(rust), E::tag(docs)]), E::tag(bug)]);
        assert_eq!(sorted(db.filter_sessions(&expr).unwrap()), vec!["s1", "s3"]);
        // NOT (rust OR bug)
        let expr = E::not(E::or([E::tag(rust), E::tag(bug)]));
        assert_eq!(db.filter_sessions(&expr).unwrap(), vec!["s4"]);
    }

    #[test]
    fn test_filter_empty_expression_matches_all() {
        let (db, _, _, _) = seeded();
        let ids = db.filter_sessions(&E::And(vec![])).unwrap();
        assert_eq!(sorted(ids), vec!["s1", "s2", "s3", "s4"]);
    }

    #[test]
    fn test_filter_unknown_tags_is_empty_not_error() {
        let (db, _, _, _) = seeded();
        let ids = db.filter_sessions(&E::or([E::tag(900), E::tag(901)])).unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn test_filter_strict_rejects_malformed() {
        let (db, rust, _, _) = seeded();
        let expr = E::and([E::tag(rust), E::Tag { tag_id: None }]);
        assert_eq!(sorted(db.filter_sessions(&expr).unwrap()), vec!["s1", "s2"]);
        assert!(matches!(
            db.filter_sessions_strict(&expr),
            Err(TagFilterError::Compile(_))
        ));
    }

    #[test]
    fn test_validate_tag_filter() {
        let (db, rust, _, _) = seeded();
        let result = db
            .validate_tag_filter(&E::and([E::tag(rust), E::tag(999)]))
            .unwrap();
        assert!(!result.valid);
        assert_eq!(result.missing_ids, vec![999]);
    }

    #[test]
    fn test_negative_tag_id_matches_nothing_and_is_reported() {
        let (db, _, _, _) = seeded();
        let expr = E::tag(-5);
        assert!(db.filter_sessions(&expr).unwrap().is_empty());

        let result = db.validate_tag_filter(&expr).unwrap();
        assert!(!result.valid);
        assert_eq!(result.missing_ids, vec![-5]);
    }

    #[test]
    fn test_query_store_round_trip() {
        let (db, rust, _, _) = seeded();
        let row = db
            .query_one("SELECT id, name FROM tags WHERE id = ?", &[SqlParam::Integer(rust)])
            .unwrap()
            .unwrap();
        assert_eq!(row[0].as_integer(), Some(rust));
        assert_eq!(row[1].as_text(), Some("rust"));
        assert!(db
            .query_one("SELECT id FROM tags WHERE id = ?", &[SqlParam::Integer(-1)])
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_query_failure_is_backend_error() {
        let db = LocalDb::open_in_memory().unwrap();
        let err = db.query_all("SELECT nope FROM sessions", &[]).unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
