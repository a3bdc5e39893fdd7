//! Module: query::builder
//! Responsibility: the query description callers build (from QL text or
//! programmatically) and hand to the executor.
//! Does not own: parsing internals or evaluation.

use crate::{
    DEFAULT_QUERY_LIMIT, MAX_QUERY_LIMIT,
    query::{
        parse::{ParseError, parse_filter, parse_ql},
        predicate::FilterExpr,
    },
    response::{ResultRow, Results},
    value::Value,
};
use serde::{Deserialize, Serialize};

///
/// SortDirection
///

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

///
/// SortPredicate
///

#[derive(Clone, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub struct SortPredicate {
    pub property: String,
    pub direction: SortDirection,
}

impl SortPredicate {
    #[must_use]
    pub fn ascending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: SortDirection::Ascending,
        }
    }

    #[must_use]
    pub fn descending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: SortDirection::Descending,
        }
    }
}

///
/// Projection
///
/// What each result row carries: whole entities, a property subset in
/// declaration order, or renamed properties. Absent properties project as
/// null rather than dropping the column.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Projection {
    All,
    Fields(Vec<String>),
    /// (result name, source property path) pairs.
    Aliased(Vec<(String, String)>),
}

impl Projection {
    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

///
/// Query
///
/// A complete, immutable-once-executed query description. Builder methods
/// chain; `add_filter` conjoins with any existing filter, matching how
/// repeated QL `and` clauses compose.
///

#[derive(Clone, Debug)]
pub struct Query {
    entity_type: Option<String>,
    connection_type: Option<String>,
    filter: Option<FilterExpr>,
    sorts: Vec<SortPredicate>,
    projection: Projection,
    limit: usize,
    cursor: Option<String>,
    reversed: bool,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            entity_type: None,
            connection_type: None,
            filter: None,
            sorts: Vec::new(),
            projection: Projection::All,
            limit: DEFAULT_QUERY_LIMIT,
            cursor: None,
            reversed: false,
        }
    }
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from QL text (`select * where name = 'x' order by created
    /// limit 5`).
    pub fn from_ql(ql: &str) -> Result<Self, ParseError> {
        let parsed = parse_ql(ql)?;

        let query = Self {
            filter: parsed.filter,
            sorts: parsed.sorts,
            projection: parsed.projection,
            ..Self::default()
        };

        Ok(match parsed.limit {
            Some(limit) => query.set_limit(limit),
            None => query,
        })
    }

    #[must_use]
    pub fn add_equality_filter(self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add_filter(FilterExpr::eq(property, value))
    }

    #[must_use]
    pub fn add_contains_filter(self, property: impl Into<String>, token: impl Into<Value>) -> Self {
        self.add_filter(FilterExpr::contains(property, token))
    }

    /// Conjoin a filter fragment given as QL text (`"index >= 10"`).
    pub fn add_filter_ql(self, fragment: &str) -> Result<Self, ParseError> {
        let expr = parse_filter(fragment)?;
        Ok(self.add_filter(expr))
    }

    /// Conjoin another filter subtree onto the query.
    #[must_use]
    pub fn add_filter(mut self, expr: FilterExpr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    #[must_use]
    pub fn add_sort(mut self, sort: SortPredicate) -> Self {
        self.sorts.push(sort);
        self
    }

    /// Requested page size, clamped to the hard cap. Zero resets to the
    /// default.
    #[must_use]
    pub fn set_limit(mut self, limit: usize) -> Self {
        self.limit = if limit == 0 {
            DEFAULT_QUERY_LIMIT
        } else {
            limit.min(MAX_QUERY_LIMIT)
        };
        self
    }

    #[must_use]
    pub fn set_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    #[must_use]
    pub const fn set_reversed(mut self, reversed: bool) -> Self {
        self.reversed = reversed;
        self
    }

    #[must_use]
    pub fn set_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    #[must_use]
    pub fn set_connection_type(mut self, connection_type: impl Into<String>) -> Self {
        self.connection_type = Some(connection_type.into());
        self
    }

    #[must_use]
    pub fn set_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    #[must_use]
    pub fn entity_type(&self) -> Option<&str> {
        self.entity_type.as_deref()
    }

    #[must_use]
    pub fn connection_type(&self) -> Option<&str> {
        self.connection_type.as_deref()
    }

    #[must_use]
    pub const fn filter(&self) -> Option<&FilterExpr> {
        self.filter.as_ref()
    }

    #[must_use]
    pub fn sorts(&self) -> &[SortPredicate] {
        &self.sorts
    }

    #[must_use]
    pub const fn projection(&self) -> &Projection {
        &self.projection
    }

    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    #[must_use]
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    #[must_use]
    pub const fn reversed(&self) -> bool {
        self.reversed
    }

    /// Flatten projected rows the way `select` callers consume them: a
    /// single selected property yields its bare values, anything wider
    /// yields one map per row. Whole-entity results flatten to nothing.
    #[must_use]
    pub fn selection_results(&self, results: &Results) -> Vec<Value> {
        match &self.projection {
            Projection::All => Vec::new(),
            Projection::Fields(paths) if paths.len() == 1 => results
                .rows()
                .iter()
                .filter_map(ResultRow::as_projected)
                .map(|map| map.get(&paths[0]).cloned().unwrap_or(Value::Null))
                .collect(),
            Projection::Fields(_) | Projection::Aliased(_) => results
                .rows()
                .iter()
                .filter_map(ResultRow::as_projected)
                .map(|map| {
                    Value::Map(map.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
                })
                .collect(),
        }
    }
}
