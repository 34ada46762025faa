//! Lowering of tag-filter expressions into set-algebra SQL.
//!
//! Every node becomes a subquery returning one column of session ids:
//!
//! | node          | subquery                                              |
//! |---------------|-------------------------------------------------------|
//! | `tag`         | `SELECT session_id FROM session_tags WHERE tag_id = ?` |
//! | `and`         | `(a) INTERSECT (b) INTERSECT ...`                     |
//! | `or`          | `(a) UNION (b) UNION ...`                             |
//! | `not`         | `SELECT id FROM sessions EXCEPT (a)`                  |
//!
//! Parameters are appended in the order their placeholders appear.

use serde::Serialize;

use crate::error::CompileError;
use crate::store::SqlParam;
use crate::tag_filter::{usable_tag_id, TagFilterExpression};
use crate::validate::structural_errors;

/// Clause used when the expression places no constraint at all.
pub const MATCH_ALL_CLAUSE: &str = "WHERE 1=1";

const TAG_SUBQUERY: &str = "SELECT session_id FROM session_tags WHERE tag_id = ?";
const ALL_SESSIONS: &str = "SELECT id FROM sessions";

/// How an operand of `INTERSECT` / `UNION` / `EXCEPT` is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlDialect {
    /// `(subquery)`
    #[default]
    Standard,
    /// `SELECT * FROM (subquery)`; SQLite rejects parenthesized compound operands.
    Sqlite,
}

impl SqlDialect {
    fn operand(self, subquery: &str) -> String {
        match self {
            Self::Standard => format!("({subquery})"),
            Self::Sqlite => format!("SELECT * FROM ({subquery})"),
        }
    }
}

/// A `WHERE` clause over `sessions s` plus its positional parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledQuery {
    pub where_clause: String,
    pub params: Vec<SqlParam>,
}

impl CompiledQuery {
    pub fn match_all() -> Self {
        Self {
            where_clause: MATCH_ALL_CLAUSE.to_string(),
            params: Vec::new(),
        }
    }

    /// Full statement selecting the ids of matching sessions.
    pub fn select_session_ids(&self) -> String {
        format!("SELECT s.id FROM sessions s {}", self.where_clause)
    }
}

/// Lower one node into a subquery, appending its parameters to `params`.
///
/// Returns `None` when the node places no constraint: a tag without a usable
/// id, or a connective whose children all dropped out. A `None` subtree never
/// leaves parameters behind.
pub fn compile_subquery(expr: &TagFilterExpression, params: &mut Vec<SqlParam>) -> Option<String> {
    compile_subquery_with(expr, SqlDialect::Standard, params)
}

pub fn compile_subquery_with(
    expr: &TagFilterExpression,
    dialect: SqlDialect,
    params: &mut Vec<SqlParam>,
) -> Option<String> {
    match expr {
        TagFilterExpression::Tag { tag_id } => {
            let tag_id = usable_tag_id(*tag_id)?;
            params.push(SqlParam::Integer(tag_id));
            Some(TAG_SUBQUERY.to_string())
        }
        TagFilterExpression::And(children) => compose(children, "INTERSECT", dialect, params),
        TagFilterExpression::Or(children) => compose(children, "UNION", dialect, params),
        TagFilterExpression::Not(child) => {
            let inner = compile_subquery_with(child.as_deref()?, dialect, params)?;
            Some(format!("{ALL_SESSIONS} EXCEPT {}", dialect.operand(&inner)))
        }
    }
}

fn compose(
    children: &[TagFilterExpression],
    operator: &str,
    dialect: SqlDialect,
    params: &mut Vec<SqlParam>,
) -> Option<String> {
    let mut parts: Vec<String> = children
        .iter()
        .filter_map(|child| compile_subquery_with(child, dialect, params))
        .collect();

    match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => Some(
            parts
                .iter()
                .map(|part| dialect.operand(part))
                .collect::<Vec<_>>()
                .join(&format!(" {operator} ")),
        ),
    }
}

/// Compile an expression, degrading malformed subtrees to "no constraint".
pub fn build_tag_filter_query(expr: &TagFilterExpression) -> CompiledQuery {
    build_tag_filter_query_with(expr, SqlDialect::Standard)
}

pub fn build_tag_filter_query_with(expr: &TagFilterExpression, dialect: SqlDialect) -> CompiledQuery {
    let mut params = Vec::new();
    match compile_subquery_with(expr, dialect, &mut params) {
        Some(subquery) => CompiledQuery {
            where_clause: format!("WHERE s.id IN ({subquery})"),
            params,
        },
        None => CompiledQuery::match_all(),
    }
}

/// Compile an expression, refusing any node the lenient compiler would drop.
pub fn build_tag_filter_query_strict(
    expr: &TagFilterExpression,
) -> Result<CompiledQuery, CompileError> {
    build_tag_filter_query_strict_with(expr, SqlDialect::Standard)
}

pub fn build_tag_filter_query_strict_with(
    expr: &TagFilterExpression,
    dialect: SqlDialect,
) -> Result<CompiledQuery, CompileError> {
    if let Some(first) = structural_errors(expr).into_iter().next() {
        return Err(first);
    }
    Ok(build_tag_filter_query_with(expr, dialect))
}
