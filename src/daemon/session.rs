//! Per-connection session state and filter evaluation
//!
//! A session holds the filter lists and language preference accumulated by
//! one client connection. Filter dimensions are AND-combined, expressions
//! within a dimension are OR-combined, and values within an expression
//! combine according to the expression's op.

use std::sync::Arc;

use crate::index::Entry;

use super::protocol::{OpTag, Value};

/// Default session language.
pub const DEFAULT_LANGUAGE: &str = "en";

/// How values within one filter expression combine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Or,
    And,
    Not,
}

/// A single predicate term: one or more values plus a combining op
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExpr {
    pub values: Vec<String>,
    pub op: FilterOp,
}

impl FilterExpr {
    /// Build an expression from command arguments: string args become
    /// values, boolean args select the op (last one wins, `t` means or,
    /// `f` means and). Returns `None` when no string was supplied.
    pub fn from_args(args: &[Value], default_op: FilterOp) -> Option<Self> {
        let mut values = Vec::new();
        let mut op = default_op;
        for arg in args {
            match arg {
                Value::Str(s) => values.push(s.clone()),
                Value::Bool(tag) => {
                    op = match tag {
                        OpTag::Or | OpTag::True => FilterOp::Or,
                        OpTag::And | OpTag::False => FilterOp::And,
                        OpTag::Not => FilterOp::Not,
                    }
                }
                Value::Int(_) => {}
            }
        }
        if values.is_empty() {
            None
        } else {
            Some(Self { values, op })
        }
    }

    fn combine(&self, pred: impl Fn(&str) -> bool) -> bool {
        match self.op {
            FilterOp::Or => self.values.iter().any(|v| pred(v)),
            FilterOp::And => self.values.iter().all(|v| pred(v)),
            FilterOp::Not => !self.values.iter().any(|v| pred(v)),
        }
    }

    /// Case-insensitive substring match against the default name and every
    /// localized name.
    pub fn matches_name(&self, entry: &Entry) -> bool {
        self.combine(|value| {
            let needle = value.to_lowercase();
            entry.name.to_lowercase().contains(&needle)
                || entry
                    .localized_names
                    .values()
                    .any(|name| name.to_lowercase().contains(&needle))
        })
    }

    /// Case-insensitive equality against any category tag.
    pub fn matches_category(&self, entry: &Entry) -> bool {
        self.combine(|value| {
            entry
                .categories
                .iter()
                .any(|cat| cat.eq_ignore_ascii_case(value))
        })
    }

    /// Case-sensitive substring match against the source path.
    pub fn matches_path(&self, entry: &Entry) -> bool {
        let path = entry.path.to_string_lossy();
        self.combine(|value| path.contains(value))
    }
}

/// Per-connection state: filters plus language preference
#[derive(Debug)]
pub struct Session {
    pub name_filters: Vec<FilterExpr>,
    pub cat_filters: Vec<FilterExpr>,
    pub path_filters: Vec<FilterExpr>,
    pub language: String,
}

impl Session {
    pub fn new() -> Self {
        Self {
            name_filters: Vec::new(),
            cat_filters: Vec::new(),
            path_filters: Vec::new(),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    /// Empty all three filter lists.
    pub fn clear_filters(&mut self) {
        self.name_filters.clear();
        self.cat_filters.clear();
        self.path_filters.clear();
    }

    /// Whether the entry passes every dimension that has filters. A
    /// dimension with no expressions imposes no constraint.
    pub fn matches(&self, entry: &Entry) -> bool {
        dimension_matches(&self.name_filters, |f| f.matches_name(entry))
            && dimension_matches(&self.cat_filters, |f| f.matches_category(entry))
            && dimension_matches(&self.path_filters, |f| f.matches_path(entry))
    }

    /// Filter a snapshot down to the matching entries.
    pub fn filter(&self, entries: Vec<Arc<Entry>>) -> Vec<Arc<Entry>> {
        entries
            .into_iter()
            .filter(|entry| self.matches(entry))
            .collect()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn dimension_matches(filters: &[FilterExpr], matches: impl Fn(&FilterExpr) -> bool) -> bool {
    filters.is_empty() || filters.iter().any(matches)
}
