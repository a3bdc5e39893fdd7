//! Module: executor::eval
//! Responsibility: turning a filter tree into an id set via bounded index
//! pulls, the residual entity matcher, and the result-order comparator.
//! Does not own: pagination or projection (mod.rs).

use crate::{
    entity::Entity,
    error::EngineError,
    index::{IndexStore, RangeBound, ScanAnchor, ScanPage},
    obs::EngineCounters,
    query::{CompareOp, ComparePredicate, FilterExpr, SortDirection, SortPredicate},
    retry::RetryPolicy,
    types::{EntityId, Scope},
    value::{Value, canonical_cmp},
};
use std::{cmp::Ordering, collections::BTreeSet};

/// Rows pulled per index round trip while materializing a leaf.
pub(crate) const PULL_BATCH: usize = 256;

pub(crate) struct EvalContext<'a> {
    pub index: &'a dyn IndexStore,
    pub scope: &'a Scope,
    pub entity_type: &'a str,
    pub retry: &'a RetryPolicy,
    pub counters: &'a EngineCounters,
}

impl EvalContext<'_> {
    /// Evaluate the tree to an id set. `universe` is the collection's full
    /// membership, used as the complement domain for `Not`; the caller
    /// still intersects the final set with it.
    pub(crate) fn evaluate(
        &self,
        expr: &FilterExpr,
        universe: &BTreeSet<EntityId>,
    ) -> Result<BTreeSet<EntityId>, EngineError> {
        match expr {
            FilterExpr::Compare(leaf) => self.evaluate_leaf(leaf),
            FilterExpr::And(children) => {
                let mut iter = children.iter();
                let Some(first) = iter.next() else {
                    return Ok(universe.clone());
                };
                let mut acc = self.evaluate(first, universe)?;
                for child in iter {
                    if acc.is_empty() {
                        break;
                    }
                    let next = self.evaluate(child, universe)?;
                    acc = acc.intersection(&next).cloned().collect();
                }
                Ok(acc)
            }
            FilterExpr::Or(children) => {
                let mut acc = BTreeSet::new();
                for child in children {
                    let next = self.evaluate(child, universe)?;
                    acc.extend(next);
                }
                Ok(acc)
            }
            FilterExpr::Not(inner) => {
                let matched = self.evaluate(inner, universe)?;
                Ok(universe.difference(&matched).cloned().collect())
            }
        }
    }

    fn evaluate_leaf(&self, leaf: &ComparePredicate) -> Result<BTreeSet<EntityId>, EngineError> {
        match leaf.op {
            CompareOp::Eq => self.drain_equals(&leaf.property, &leaf.value),
            CompareOp::Contains => self.drain_contains(&leaf.property, &leaf.value),
            CompareOp::Gt => self.drain_range(
                &leaf.property,
                Some(RangeBound::exclusive(leaf.value.clone())),
                None,
                leaf.value.canonical_rank(),
            ),
            CompareOp::Gte => self.drain_range(
                &leaf.property,
                Some(RangeBound::inclusive(leaf.value.clone())),
                None,
                leaf.value.canonical_rank(),
            ),
            CompareOp::Lt => self.drain_range(
                &leaf.property,
                None,
                Some(RangeBound::exclusive(leaf.value.clone())),
                leaf.value.canonical_rank(),
            ),
            CompareOp::Lte => self.drain_range(
                &leaf.property,
                None,
                Some(RangeBound::inclusive(leaf.value.clone())),
                leaf.value.canonical_rank(),
            ),
        }
    }

    fn drain_equals(&self, property: &str, value: &Value) -> Result<BTreeSet<EntityId>, EngineError> {
        let mut out = BTreeSet::new();
        let mut anchor: Option<ScanAnchor> = None;

        loop {
            let page = self.pull(|| {
                self.index.scan_equals(
                    self.scope,
                    self.entity_type,
                    property,
                    value,
                    anchor.as_ref(),
                    PULL_BATCH,
                    false,
                )
            })?;

            out.extend(page.hits.iter().map(|hit| hit.id.clone()));
            if page.exhausted {
                break;
            }
            let Some(last) = page.last_anchor().cloned() else {
                break;
            };
            anchor = Some(last);
        }

        Ok(out)
    }

    // every token of the literal must match; a tokenless literal matches
    // nothing
    fn drain_contains(
        &self,
        property: &str,
        literal: &Value,
    ) -> Result<BTreeSet<EntityId>, EngineError> {
        let tokens = literal.tokens();
        let Some((first, rest)) = tokens.split_first() else {
            return Ok(BTreeSet::new());
        };

        let mut acc = self.drain_contains_token(property, first)?;
        for token in rest {
            if acc.is_empty() {
                break;
            }
            let next = self.drain_contains_token(property, token)?;
            acc = acc.intersection(&next).cloned().collect();
        }

        Ok(acc)
    }

    fn drain_contains_token(
        &self,
        property: &str,
        token: &str,
    ) -> Result<BTreeSet<EntityId>, EngineError> {
        let mut out = BTreeSet::new();
        let mut anchor: Option<ScanAnchor> = None;

        loop {
            let page = self.pull(|| {
                self.index.scan_contains(
                    self.scope,
                    self.entity_type,
                    property,
                    token,
                    anchor.as_ref(),
                    PULL_BATCH,
                    false,
                )
            })?;

            out.extend(page.hits.iter().map(|hit| hit.id.clone()));
            if page.exhausted {
                break;
            }
            let Some(last) = page.last_anchor().cloned() else {
                break;
            };
            anchor = Some(last);
        }

        Ok(out)
    }

    fn drain_range(
        &self,
        property: &str,
        lower: Option<RangeBound>,
        upper: Option<RangeBound>,
        rank: u8,
    ) -> Result<BTreeSet<EntityId>, EngineError> {
        let mut out = BTreeSet::new();
        let mut anchor: Option<ScanAnchor> = None;

        loop {
            let page = self.pull(|| {
                self.index.scan_range(
                    self.scope,
                    self.entity_type,
                    property,
                    lower.as_ref(),
                    upper.as_ref(),
                    anchor.as_ref(),
                    PULL_BATCH,
                    false,
                )
            })?;

            // an open-ended bound stops at the literal's canonical rank so
            // a numeric range never swallows text rows sorted above it
            out.extend(
                page.hits
                    .iter()
                    .filter(|hit| hit.anchor.value.canonical_rank() == rank)
                    .map(|hit| hit.id.clone()),
            );
            if page.exhausted {
                break;
            }
            let Some(last) = page.last_anchor().cloned() else {
                break;
            };
            anchor = Some(last);
        }

        Ok(out)
    }

    fn pull<F>(&self, mut op: F) -> Result<ScanPage, EngineError>
    where
        F: FnMut() -> Result<ScanPage, crate::error::TransientStoreError>,
    {
        let page = self
            .retry
            .run(&mut op, || self.counters.record_transient_retry())?;
        self.counters.record_index_scan();
        Ok(page)
    }
}

/// Residual matcher: the same filter semantics, applied to a resolved
/// entity. Used for connection searches, where fan-outs are small enough
/// that index scans buy nothing.
pub(crate) fn matches_entity(expr: &FilterExpr, entity: &Entity) -> bool {
    match expr {
        FilterExpr::Compare(leaf) => leaf_matches(leaf, entity),
        FilterExpr::And(children) => children.iter().all(|c| matches_entity(c, entity)),
        FilterExpr::Or(children) => children.iter().any(|c| matches_entity(c, entity)),
        FilterExpr::Not(inner) => !matches_entity(inner, entity),
    }
}

fn leaf_matches(leaf: &ComparePredicate, entity: &Entity) -> bool {
    let Some(actual) = entity.property(&leaf.property) else {
        return false;
    };

    match leaf.op {
        CompareOp::Contains => {
            let needles = leaf.value.tokens();
            if needles.is_empty() {
                return false;
            }
            let haystack = actual.tokens();
            needles.iter().all(|needle| haystack.contains(needle))
        }
        op => any_scalar(actual, |scalar| scalar_matches(op, scalar, &leaf.value)),
    }
}

// list properties match when any element matches
fn any_scalar(value: &Value, mut pred: impl FnMut(&Value) -> bool) -> bool {
    match value {
        Value::List(items) => items.iter().any(|item| pred(item)),
        other => pred(other),
    }
}

fn scalar_matches(op: CompareOp, actual: &Value, literal: &Value) -> bool {
    match op {
        CompareOp::Eq => actual == literal,
        CompareOp::Contains => false,
        CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte => {
            if actual.canonical_rank() != literal.canonical_rank() {
                return false;
            }
            let ord = canonical_cmp(actual, literal);
            match op {
                CompareOp::Gt => ord == Ordering::Greater,
                CompareOp::Gte => ord != Ordering::Less,
                CompareOp::Lt => ord == Ordering::Less,
                CompareOp::Lte => ord != Ordering::Greater,
                CompareOp::Eq | CompareOp::Contains => false,
            }
        }
    }
}

///
/// OrderedRow
///
/// A candidate row positioned in result order: its sort key values (one per
/// sort predicate, null when absent) and its id as the final tiebreak.
///

#[derive(Clone, Debug)]
pub(crate) struct OrderedRow {
    pub id: EntityId,
    pub sort_values: Vec<Value>,
}

/// Total result order. With no sorts this is creation order (id order);
/// `reversed` flips the whole order, tiebreak included.
pub(crate) fn cmp_rows(
    a: &OrderedRow,
    b: &OrderedRow,
    sorts: &[SortPredicate],
    reversed: bool,
) -> Ordering {
    let mut ord = Ordering::Equal;

    for (i, sort) in sorts.iter().enumerate() {
        let left = a.sort_values.get(i).unwrap_or(&Value::Null);
        let right = b.sort_values.get(i).unwrap_or(&Value::Null);

        ord = canonical_cmp(left, right);
        if sort.direction == SortDirection::Descending {
            ord = ord.reverse();
        }
        if ord != Ordering::Equal {
            break;
        }
    }

    if ord == Ordering::Equal {
        ord = a.id.cmp(&b.id);
    }
    if reversed { ord.reverse() } else { ord }
}

/// Flatten one property into its indexable rows: scalars index as-is, list
/// elements index under the list's name, nested maps index under dotted
/// paths. Nulls never index.
pub(crate) fn flatten_indexable(prefix: &str, value: &Value, out: &mut Vec<(String, Value)>) {
    match value {
        scalar if scalar.is_indexable_scalar() => out.push((prefix.to_string(), scalar.clone())),
        Value::List(items) => {
            for item in items {
                flatten_indexable(prefix, item, out);
            }
        }
        Value::Map(pairs) => {
            for (key, nested) in pairs {
                flatten_indexable(&format!("{prefix}.{key}"), nested, out);
            }
        }
        _ => {}
    }
}
