use serde::{Deserialize, Serialize};

use crate::error::{CompileError, TagFilterError};
use crate::store::{QueryStore, SqlParam};
use crate::tag_filter::{usable_tag_id, TagFilterExpression};

const TAG_EXISTS_SQL: &str = "SELECT id FROM tags WHERE id = ?";

/// Outcome of checking an expression's tag references against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagValidation {
    pub valid: bool,
    /// Ascending.
    pub missing_ids: Vec<i64>,
}

/// Looks up referenced tag ids in the tag catalog.
///
/// Advisory only: the compiler never consults it, and an unknown tag simply
/// matches no sessions when the filter runs.
pub struct TagFilterValidator<'a, S: QueryStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: QueryStore + ?Sized> TagFilterValidator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn validate(&self, expr: &TagFilterExpression) -> Result<TagValidation, TagFilterError> {
        let mut missing_ids = Vec::new();
        for tag_id in expr.tag_ids() {
            let row = self
                .store
                .query_one(TAG_EXISTS_SQL, &[SqlParam::Integer(tag_id)])
                .map_err(|source| TagFilterError::Lookup { tag_id, source })?;
            if row.is_none() {
                missing_ids.push(tag_id);
            }
        }

        if !missing_ids.is_empty() {
            tracing::debug!(?missing_ids, "tag filter references unknown tags");
        }

        Ok(TagValidation {
            valid: missing_ids.is_empty(),
            missing_ids,
        })
    }
}

pub fn validate_tag_ids<S: QueryStore + ?Sized>(
    store: &S,
    expr: &TagFilterExpression,
) -> Result<TagValidation, TagFilterError> {
    TagFilterValidator::new(store).validate(expr)
}

/// Every node the lenient compiler would drop, in depth-first order.
pub fn structural_errors(expr: &TagFilterExpression) -> Vec<CompileError> {
    let mut errors = Vec::new();
    walk(expr, "root".to_string(), &mut errors);
    errors
}

fn walk(expr: &TagFilterExpression, path: String, errors: &mut Vec<CompileError>) {
    match expr {
        TagFilterExpression::Tag { tag_id } => {
            if usable_tag_id(*tag_id).is_none() {
                errors.push(CompileError::MissingTagId { path });
            }
        }
        TagFilterExpression::And(children) | TagFilterExpression::Or(children) => {
            if children.is_empty() {
                errors.push(CompileError::EmptyChildren {
                    kind: expr.kind(),
                    path,
                });
                return;
            }
            for (i, child) in children.iter().enumerate() {
                walk(child, format!("{path}.children[{i}]"), errors);
            }
        }
        TagFilterExpression::Not(Some(child)) => {
            walk(child, format!("{path}.children[0]"), errors);
        }
        TagFilterExpression::Not(None) => {
            errors.push(CompileError::EmptyChildren { kind: "not", path });
        }
    }
}
