//! Module: response
//! Responsibility: the result page handed back to callers — rows in result
//! order plus the continuation token when more rows remain.
//! Does not own: pagination mechanics (cursor) or row selection (executor).

use crate::entity::{Entity, PropertyMap};

///
/// ResultRow
///
/// Whole entity or projected property subset, depending on the query's
/// projection. Projected rows keep the projection's declaration order and
/// carry nulls for absent properties.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ResultRow {
    Entity(Entity),
    Projected(PropertyMap),
}

impl ResultRow {
    #[must_use]
    pub const fn as_entity(&self) -> Option<&Entity> {
        match self {
            Self::Entity(entity) => Some(entity),
            Self::Projected(_) => None,
        }
    }

    #[must_use]
    pub const fn as_projected(&self) -> Option<&PropertyMap> {
        match self {
            Self::Projected(map) => Some(map),
            Self::Entity(_) => None,
        }
    }
}

///
/// Results
///
/// `cursor` is present iff more rows remain; an exhausted result never
/// carries one, so "absent cursor" is the end-of-results signal.
///

#[derive(Clone, Debug, Default)]
pub struct Results {
    rows: Vec<ResultRow>,
    cursor: Option<String>,
}

impl Results {
    #[must_use]
    pub const fn new(rows: Vec<ResultRow>, cursor: Option<String>) -> Self {
        Self { rows, cursor }
    }

    #[must_use]
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    #[must_use]
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The entity rows, in result order. Empty for projected results.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.rows.iter().filter_map(ResultRow::as_entity)
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<ResultRow> {
        self.rows
    }
}
