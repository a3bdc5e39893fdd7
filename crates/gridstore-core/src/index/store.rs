//! Module: index::store
//! Responsibility: the index store contract — puts, removes, and the three
//! bounded scan shapes (equality, range, contains).
//! Does not own: filter composition; callers combine pages as id sets.

use crate::{
    error::TransientStoreError,
    types::{EntityId, Scope},
    value::Value,
};
use serde::{Deserialize, Serialize};

///
/// ScanAnchor
///
/// Resume point inside one index run: the last row consumed, as its
/// (value, id) pair. Serialized into continuation tokens, so the shape is
/// wire-stable.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ScanAnchor {
    pub value: Value,
    pub id: EntityId,
}

///
/// ScanHit
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScanHit {
    pub id: EntityId,
    pub anchor: ScanAnchor,
}

///
/// ScanPage
///
/// One bounded pull. `exhausted` is authoritative: a short page with
/// `exhausted == false` means the caller must pull again from the last
/// anchor, never that the run ended.
///

#[derive(Clone, Debug, Default)]
pub struct ScanPage {
    pub hits: Vec<ScanHit>,
    pub exhausted: bool,
}

impl ScanPage {
    #[must_use]
    pub fn last_anchor(&self) -> Option<&ScanAnchor> {
        self.hits.last().map(|hit| &hit.anchor)
    }
}

///
/// RangeBound
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RangeBound {
    pub value: Value,
    pub inclusive: bool,
}

impl RangeBound {
    #[must_use]
    pub const fn inclusive(value: Value) -> Self {
        Self {
            value,
            inclusive: true,
        }
    }

    #[must_use]
    pub const fn exclusive(value: Value) -> Self {
        Self {
            value,
            inclusive: false,
        }
    }
}

///
/// IndexStore
///
/// Ordered secondary-index rows keyed by
/// (scope, entity type, property, kind, value, id). Writes are idempotent
/// per (row, version); scans return rows in key order (or exact reverse)
/// and never block writers.
///

pub trait IndexStore: Send + Sync {
    /// Write index rows for one property value of one entity. Text values
    /// also write token rows, so contains scans see them without a separate
    /// maintenance pass.
    fn put(
        &self,
        scope: &Scope,
        entity_type: &str,
        property: &str,
        value: &Value,
        id: &EntityId,
        version: u64,
    ) -> Result<(), TransientStoreError>;

    /// Retire the rows written by `put` for the same (value, id). Stale
    /// removes (older version than the live row) are no-ops.
    fn remove(
        &self,
        scope: &Scope,
        entity_type: &str,
        property: &str,
        value: &Value,
        id: &EntityId,
        version: u64,
    ) -> Result<(), TransientStoreError>;

    fn scan_equals(
        &self,
        scope: &Scope,
        entity_type: &str,
        property: &str,
        value: &Value,
        start_after: Option<&ScanAnchor>,
        limit: usize,
        reversed: bool,
    ) -> Result<ScanPage, TransientStoreError>;

    fn scan_range(
        &self,
        scope: &Scope,
        entity_type: &str,
        property: &str,
        lower: Option<&RangeBound>,
        upper: Option<&RangeBound>,
        start_after: Option<&ScanAnchor>,
        limit: usize,
        reversed: bool,
    ) -> Result<ScanPage, TransientStoreError>;

    fn scan_contains(
        &self,
        scope: &Scope,
        entity_type: &str,
        property: &str,
        token: &str,
        start_after: Option<&ScanAnchor>,
        limit: usize,
        reversed: bool,
    ) -> Result<ScanPage, TransientStoreError>;
}
