use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One node of a boolean tag-filter expression.
///
/// Malformed shapes are representable: a tag leaf without an id, or a
/// connective without children. The lenient compiler drops such subtrees and
/// the strict compiler reports them.
///
/// On the wire this is the `{"type": "tag", "tagId": 1}` /
/// `{"type": "and", "children": [...]}` JSON shape. A wire `not` node carries
/// a `children` list; only its first element is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireExpression", into = "WireExpression")]
pub enum TagFilterExpression {
    Tag { tag_id: Option<i64> },
    And(Vec<TagFilterExpression>),
    Or(Vec<TagFilterExpression>),
    Not(Option<Box<TagFilterExpression>>),
}

impl TagFilterExpression {
    pub fn tag(tag_id: i64) -> Self {
        Self::Tag {
            tag_id: Some(tag_id),
        }
    }

    pub fn and(children: impl IntoIterator<Item = Self>) -> Self {
        Self::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = Self>) -> Self {
        Self::Or(children.into_iter().collect())
    }

    pub fn not(child: Self) -> Self {
        Self::Not(Some(Box::new(child)))
    }

    /// Wire name of the node kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tag { .. } => "tag",
            Self::And(_) => "and",
            Self::Or(_) => "or",
            Self::Not(_) => "not",
        }
    }

    /// Every usable tag id referenced anywhere in the tree, deduplicated.
    pub fn tag_ids(&self) -> BTreeSet<i64> {
        let mut ids = BTreeSet::new();
        self.collect_tag_ids(&mut ids);
        ids
    }

    fn collect_tag_ids(&self, ids: &mut BTreeSet<i64>) {
        match self {
            Self::Tag { tag_id } => {
                if let Some(id) = usable_tag_id(*tag_id) {
                    ids.insert(id);
                }
            }
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.collect_tag_ids(ids);
                }
            }
            Self::Not(Some(child)) => child.collect_tag_ids(ids),
            Self::Not(None) => {}
        }
    }
}

impl FromStr for TagFilterExpression {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

/// `0` counts as absent. Negative ids are kept: they match no tag, which the
/// validator reports.
pub(crate) fn usable_tag_id(tag_id: Option<i64>) -> Option<i64> {
    tag_id.filter(|id| *id != 0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireExpression {
    Tag {
        #[serde(rename = "tagId", default, skip_serializing_if = "Option::is_none")]
        tag_id: Option<i64>,
    },
    And {
        #[serde(default)]
        children: Vec<WireExpression>,
    },
    Or {
        #[serde(default)]
        children: Vec<WireExpression>,
    },
    Not {
        #[serde(default)]
        children: Vec<WireExpression>,
    },
}

impl From<WireExpression> for TagFilterExpression {
    fn from(wire: WireExpression) -> Self {
        match wire {
            WireExpression::Tag { tag_id } => Self::Tag { tag_id },
            WireExpression::And { children } => {
                Self::And(children.into_iter().map(Self::from).collect())
            }
            WireExpression::Or { children } => {
                Self::Or(children.into_iter().map(Self::from).collect())
            }
            WireExpression::Not { children } => {
                if children.len() > 1 {
                    tracing::debug!(
                        dropped = children.len() - 1,
                        "not node keeps only its first child"
                    );
                }
                Self::Not(
                    children
                        .into_iter()
                        .next()
                        .map(|child| Box::new(Self::from(child))),
                )
            }
        }
    }
}

impl From<TagFilterExpression> for WireExpression {
    fn from(expr: TagFilterExpression) -> Self {
        match expr {
            TagFilterExpression::Tag { tag_id } => Self::Tag { tag_id },
            TagFilterExpression::And(children) => Self::And {
                children: children.into_iter().map(Self::from).collect(),
            },
            TagFilterExpression::Or(children) => Self::Or {
                children: children.into_iter().map(Self::from).collect(),
            },
            TagFilterExpression::Not(child) => Self::Not {
                children: child.map(|c| Self::from(*c)).into_iter().collect(),
            },
        }
    }
}
