//! Tag catalog and session-to-tag associations.

use anyhow::{ensure, Context, Result};
use rusqlite::params_from_iter;
use sea_query::{Expr, Order, Query, SimpleExpr, SqliteQueryBuilder};
use serde::Serialize;

use crate::tables::{SessionTags, Tags};
use crate::values::from_sea_values;
use crate::{Built, LocalDb};

/// Color given to tags created without one.
pub const DEFAULT_TAG_COLOR: &str = "#6b7280";

/// A user-defined label attachable to any number of sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub created_at: String,
}

// ── Query builders ─────────────────────────────────────────────────────────

/// Column order must match `row_to_tag()`.
fn tag_select() -> sea_query::SelectStatement {
    Query::select()
        .column((Tags::Table, Tags::Id))
        .column((Tags::Table, Tags::Name))
        .column((Tags::Table, Tags::Color))
        .column((Tags::Table, Tags::CreatedAt))
        .from(Tags::Table)
        .to_owned()
}

fn insert(name: &str, color: &str, created_at: &str) -> Built {
    Query::insert()
        .into_table(Tags::Table)
        .columns([Tags::Name, Tags::Color, Tags::CreatedAt])
        .values_panic([name.into(), color.into(), created_at.into()])
        .build(SqliteQueryBuilder)
}

fn get_by_id(id: i64) -> Built {
    tag_select()
        .and_where(Expr::col((Tags::Table, Tags::Id)).eq(id))
        .build(SqliteQueryBuilder)
}

fn get_by_name(name: &str) -> Built {
    tag_select()
        .and_where(Expr::col((Tags::Table, Tags::Name)).eq(name))
        .build(SqliteQueryBuilder)
}

fn list() -> Built {
    tag_select()
        .order_by((Tags::Table, Tags::Name), Order::Asc)
        .build(SqliteQueryBuilder)
}

/// `None` when there is nothing to change.
fn update(id: i64, name: Option<&str>, color: Option<&str>) -> Option<Built> {
    let mut values: Vec<(Tags, SimpleExpr)> = Vec::new();
    if let Some(name) = name {
        values.push((Tags::Name, name.into()));
    }
    if let Some(color) = color {
        values.push((Tags::Color, color.into()));
    }
    if values.is_empty() {
        return None;
    }
    Some(
        Query::update()
            .table(Tags::Table)
            .values(values)
            .and_where(Expr::col(Tags::Id).eq(id))
            .build(SqliteQueryBuilder),
    )
}

fn delete(id: i64) -> Built {
    Query::delete()
        .from_table(Tags::Table)
        .and_where(Expr::col(Tags::Id).eq(id))
        .build(SqliteQueryBuilder)
}

fn attach(session_id: &str, tag_id: i64) -> Built {
    // INSERT OR IGNORE
    let sql = "INSERT OR IGNORE INTO \"session_tags\" (\"session_id\", \"tag_id\") VALUES (?, ?)"
        .to_string();
    let values = sea_query::Values(vec![session_id.into(), tag_id.into()]);
    (sql, values)
}

fn detach(session_id: &str, tag_id: i64) -> Built {
    Query::delete()
        .from_table(SessionTags::Table)
        .and_where(Expr::col(SessionTags::SessionId).eq(session_id))
        .and_where(Expr::col(SessionTags::TagId).eq(tag_id))
        .build(SqliteQueryBuilder)
}

fn by_session(session_id: &str) -> Built {
    tag_select()
        .inner_join(
            SessionTags::Table,
            Expr::col((SessionTags::Table, SessionTags::TagId)).equals((Tags::Table, Tags::Id)),
        )
        .and_where(Expr::col((SessionTags::Table, SessionTags::SessionId)).eq(session_id))
        .order_by((Tags::Table, Tags::Name), Order::Asc)
        .build(SqliteQueryBuilder)
}

fn sessions_by_tag(tag_id: i64) -> Built {
    Query::select()
        .column(SessionTags::SessionId)
        .from(SessionTags::Table)
        .and_where(Expr::col(SessionTags::TagId).eq(tag_id))
        .order_by(SessionTags::SessionId, Order::Asc)
        .build(SqliteQueryBuilder)
}

fn row_to_tag(row: &rusqlite::Row) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        color: row.get(2)?,
        created_at: row.get(3)?,
    })
}

// ── Catalog operations ─────────────────────────────────────────────────────

impl LocalDb {
    pub fn create_tag(&self, name: &str, color: Option<&str>) -> Result<Tag> {
        let name = name.trim();
        ensure!(!name.is_empty(), "tag name must not be empty");
        let color = color.unwrap_or(DEFAULT_TAG_COLOR);
        let created_at = chrono::Utc::now().to_rfc3339();

        let (sql, values) = insert(name, color, &created_at);
        let conn = self.conn();
        conn.execute(&sql, params_from_iter(from_sea_values(&values)))
            .with_context(|| format!("create tag {name:?}"))?;
        let id = conn.last_insert_rowid();
        tracing::debug!(id, name, "created tag");

        Ok(Tag {
            id,
            name: name.to_string(),
            color: color.to_string(),
            created_at,
        })
    }

    pub fn get_tag(&self, id: i64) -> Result<Option<Tag>> {
        self.query_built_optional(&get_by_id(id), row_to_tag)
    }

    pub fn get_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        self.query_built_optional(&get_by_name(name), row_to_tag)
    }

    /// All tags, ordered by name.
    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        self.query_built(&list(), row_to_tag)
    }

    /// Rename and/or recolor a tag. Returns `None` if the tag does not exist.
    pub fn update_tag(
        &self,
        id: i64,
        name: Option<&str>,
        color: Option<&str>,
    ) -> Result<Option<Tag>> {
        let name = name.map(str::trim);
        if let Some(name) = name {
            ensure!(!name.is_empty(), "tag name must not be empty");
        }
        let Some(built) = update(id, name, color) else {
            return self.get_tag(id);
        };
        let changed = self
            .execute_built(&built)
            .with_context(|| format!("update tag {id}"))?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_tag(id)
    }

    /// Delete a tag and every association to it.
    pub fn delete_tag(&self, id: i64) -> Result<bool> {
        let changed = self
            .execute_built(&delete(id))
            .with_context(|| format!("delete tag {id}"))?;
        Ok(changed > 0)
    }

    /// Attach a tag to a session. Returns `false` if it was already attached.
    pub fn add_tag_to_session(&self, session_id: &str, tag_id: i64) -> Result<bool> {
        let changed = self
            .execute_built(&attach(session_id, tag_id))
            .with_context(|| format!("tag session {session_id} with {tag_id}"))?;
        Ok(changed > 0)
    }

    pub fn remove_tag_from_session(&self, session_id: &str, tag_id: i64) -> Result<bool> {
        let changed = self
            .execute_built(&detach(session_id, tag_id))
            .with_context(|| format!("untag session {session_id} from {tag_id}"))?;
        Ok(changed > 0)
    }

    pub fn tags_for_session(&self, session_id: &str) -> Result<Vec<Tag>> {
        self.query_built(&by_session(session_id), row_to_tag)
    }

    pub fn sessions_for_tag(&self, tag_id: i64) -> Result<Vec<String>> {
        self.query_built(&sessions_by_tag(tag_id), |row| row.get(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionRow;

    fn db_with_sessions(ids: &[&str]) -> LocalDb {
        let db = LocalDb::open_in_memory().unwrap();
        for id in ids {
            db.upsert_session(&SessionRow::new(*id, "2024-01-01T00:00:00Z"))
                .unwrap();
        }
        db
    }

    #[test]
    fn builders_emit_sqlite_placeholders() {
        let (sql, values) = get_by_id(3);
        assert!(sql.starts_with(r#"SELECT "tags"."id""#));
        assert!(sql.contains(r#"FROM "tags""#));
        assert!(sql.ends_with("= ?"));
        assert_eq!(values.0.len(), 1);
        assert!(update(1, None, None).is_none());
    }

    #[test]
    fn create_get_and_list() {
        let db = db_with_sessions(&[]);
        let bug = db.create_tag("bug", Some("#ef4444")).unwrap();
        let feature = db.create_tag("  feature ", None).unwrap();

        assert_eq!(feature.name, "feature");
        assert_eq!(feature.color, DEFAULT_TAG_COLOR);
        assert_eq!(db.get_tag(bug.id).unwrap(), Some(bug.clone()));
        assert_eq!(db.get_tag_by_name("feature").unwrap(), Some(feature.clone()));
        assert_eq!(db.get_tag(999).unwrap(), None);

        let names: Vec<String> = db.list_tags().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["bug", "feature"]);
    }

    #[test]
    fn duplicate_and_blank_names_are_rejected() {
        let db = db_with_sessions(&[]);
        db.create_tag("bug", None).unwrap();
        assert!(db.create_tag("bug", None).is_err());
        assert!(db.create_tag("   ", None).is_err());
    }

    #[test]
    fn update_tag_fields() {
        let db = db_with_sessions(&[]);
        let tag = db.create_tag("wip", None).unwrap();

        let renamed = db.update_tag(tag.id, Some("done"), None).unwrap().unwrap();
        assert_eq!(renamed.name, "done");
        assert_eq!(renamed.color, DEFAULT_TAG_COLOR);

        let recolored = db.update_tag(tag.id, None, Some("#10b981")).unwrap().unwrap();
        assert_eq!(recolored.color, "#10b981");

        assert_eq!(db.update_tag(tag.id, None, None).unwrap(), Some(recolored));
        assert_eq!(db.update_tag(404, Some("x"), None).unwrap(), None);
    }

    #[test]
    fn associations_are_idempotent() {
        let db = db_with_sessions(&["s1", "s2"]);
        let tag = db.create_tag("review", None).unwrap();

        assert!(db.add_tag_to_session("s1", tag.id).unwrap());
        assert!(!db.add_tag_to_session("s1", tag.id).unwrap());
        assert!(db.add_tag_to_session("s2", tag.id).unwrap());

        assert_eq!(db.sessions_for_tag(tag.id).unwrap(), vec!["s1", "s2"]);
        assert_eq!(db.tags_for_session("s1").unwrap(), vec![tag.clone()]);

        assert!(db.remove_tag_from_session("s1", tag.id).unwrap());
        assert!(!db.remove_tag_from_session("s1", tag.id).unwrap());
        assert_eq!(db.sessions_for_tag(tag.id).unwrap(), vec!["s2"]);
    }

    #[test]
    fn tagging_unknown_session_fails() {
        let db = db_with_sessions(&[]);
        let tag = db.create_tag("orphan", None).unwrap();
        assert!(db.add_tag_to_session("missing", tag.id).is_err());
    }

    #[test]
    fn deleting_tag_cascades_to_sessions() {
        let db = db_with_sessions(&["s1"]);
        let tag = db.create_tag("temp", None).unwrap();
        db.add_tag_to_session("s1", tag.id).unwrap();

        assert!(db.delete_tag(tag.id).unwrap());
        assert!(!db.delete_tag(tag.id).unwrap());
        assert!(db.tags_for_session("s1").unwrap().is_empty());
        assert!(db.sessions_for_tag(tag.id).unwrap().is_empty());
    }
}
