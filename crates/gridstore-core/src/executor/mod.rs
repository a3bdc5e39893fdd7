//! Module: executor
//! Responsibility: the engine — query validation, planning, set evaluation,
//! ordering, pagination, and projection over the pluggable stores.
//! Does not own: store internals or the wire format of cursors.

mod eval;
mod store;

#[cfg(test)]
mod tests;

pub use store::{EntityResolver, MemoryEntityStore};

use crate::{
    cursor::{Boundary, CursorToken, QuerySignature},
    entity::{Entity, PropertyMap},
    error::EngineError,
    index::{IndexCatalog, IndexStore, ScanAnchor},
    membership::MembershipStore,
    obs::{CounterSnapshot, EngineCounters},
    query::{CompareOp, FilterExpr, Projection, Query, singularize},
    response::{ResultRow, Results},
    retry::RetryPolicy,
    types::{EntityId, Scope},
    unique::UniqueValueIndex,
    value::Value,
};
use eval::{EvalContext, OrderedRow, PULL_BATCH, cmp_rows, flatten_indexable, matches_entity};
use std::{cmp::Ordering, collections::BTreeSet, sync::Arc};

///
/// Engine
///
/// One engine serves every scope; every operation takes the scope
/// explicitly and no state leaks across them. Stores are trait objects so
/// embedded and clustered deployments share this code path.
///

pub struct Engine {
    index: Arc<dyn IndexStore>,
    membership: Arc<dyn MembershipStore>,
    entities: Arc<dyn EntityResolver>,
    unique: UniqueValueIndex,
    catalog: IndexCatalog,
    counters: Arc<EngineCounters>,
    retry: RetryPolicy,
}

impl Engine {
    #[must_use]
    pub fn new(
        index: Arc<dyn IndexStore>,
        membership: Arc<dyn MembershipStore>,
        entities: Arc<dyn EntityResolver>,
        unique: UniqueValueIndex,
    ) -> Self {
        let counters = Arc::new(EngineCounters::new());

        Self {
            index,
            membership,
            entities,
            // conflicts recorded through the unique surface land in the
            // same snapshot
            unique: unique.with_counters(Arc::clone(&counters)),
            catalog: IndexCatalog::new(),
            counters,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub const fn catalog(&self) -> &IndexCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn unique(&self) -> &UniqueValueIndex {
        &self.unique
    }

    #[must_use]
    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    //
    // search
    //

    /// Search one collection of `owner`. Unfiltered queries return members
    /// in creation order; filtered and sorted queries page through the
    /// same deterministic total order their cursor was minted for.
    pub fn search_collection(
        &self,
        scope: &Scope,
        owner: &EntityId,
        collection: &str,
        query: &Query,
    ) -> Result<Results, EngineError> {
        self.counters.record_query();

        let entity_type = query
            .entity_type()
            .map_or_else(|| singularize(collection), str::to_string);

        self.validate(&entity_type, query)?;

        let target = format!("collection/{owner}/{collection}");
        let signature = QuerySignature::compute(
            scope,
            &target,
            query.filter(),
            query.sorts(),
            query.reversed(),
        );
        let token = self.decode_cursor(query, &signature)?;

        // single equality leaf in creation order resumes incrementally off
        // its index run instead of rematerializing the whole set
        if let Some(results) = self.try_incremental_equality(
            scope,
            owner,
            collection,
            &entity_type,
            query,
            &signature,
            token.as_ref(),
        )? {
            return Ok(results);
        }

        let universe = self.drain_members(scope, owner, collection)?;
        let universe_set: BTreeSet<EntityId> = universe.iter().cloned().collect();

        let candidates: Vec<EntityId> = match query.filter() {
            Some(filter) => {
                let ctx = EvalContext {
                    index: self.index.as_ref(),
                    scope,
                    entity_type: &entity_type,
                    retry: &self.retry,
                    counters: &self.counters,
                };
                let matched = ctx.evaluate(filter, &universe_set)?;
                // membership bounds every result, complement included
                matched.intersection(&universe_set).cloned().collect()
            }
            None => universe,
        };

        let rows = self.order_rows(scope, candidates, query)?;
        self.paginate(scope, rows, query, &signature, token.as_ref())
    }

    /// Search the entities connected from `source` via one connection type.
    /// Fan-outs are bounded, so filters evaluate against the resolved
    /// targets rather than through the index.
    pub fn search_connected_entities(
        &self,
        scope: &Scope,
        source: &EntityId,
        connection_type: &str,
        query: &Query,
    ) -> Result<Results, EngineError> {
        self.counters.record_query();

        let entity_type = query
            .entity_type()
            .map_or_else(|| singularize(connection_type), str::to_string);

        self.validate(&entity_type, query)?;

        let target = format!("connection/{source}/{connection_type}");
        let signature = QuerySignature::compute(
            scope,
            &target,
            query.filter(),
            query.sorts(),
            query.reversed(),
        );
        let token = self.decode_cursor(query, &signature)?;

        let connected = self.drain_connected(scope, source, connection_type)?;

        let mut candidates = Vec::with_capacity(connected.len());
        for id in connected {
            let Some(entity) = self.resolve(scope, &id)? else {
                continue;
            };
            if let Some(required) = query.entity_type() {
                if entity.kind() != required {
                    continue;
                }
            }
            if let Some(filter) = query.filter() {
                if !matches_entity(filter, &entity) {
                    continue;
                }
            }
            candidates.push(id);
        }

        let rows = self.order_rows(scope, candidates, query)?;
        self.paginate(scope, rows, query, &signature, token.as_ref())
    }

    //
    // index maintenance
    //

    /// Write index rows for every indexable property of an entity: scalars
    /// as-is, list elements individually, nested maps under dotted paths.
    pub fn index_entity(&self, scope: &Scope, entity: &Entity) -> Result<(), EngineError> {
        for (property, value) in flatten_entity(entity) {
            if !self.catalog.is_indexed(entity.kind(), &property) {
                continue;
            }
            self.index
                .put(scope, entity.kind(), &property, &value, entity.id(), entity.version())?;
            self.counters.record_index_write();
        }

        Ok(())
    }

    /// Retire every index row of an entity at its current version.
    pub fn deindex_entity(&self, scope: &Scope, entity: &Entity) -> Result<(), EngineError> {
        for (property, value) in flatten_entity(entity) {
            self.index
                .remove(scope, entity.kind(), &property, &value, entity.id(), entity.version())?;
        }

        Ok(())
    }

    /// Full disappearance on delete: index rows retired and every
    /// membership/connection edge severed, both directions.
    pub fn purge_entity(&self, scope: &Scope, entity: &Entity) -> Result<(), EngineError> {
        self.deindex_entity(scope, entity)?;
        self.membership.sever_all(scope, entity.id())?;
        Ok(())
    }

    //
    // internals
    //

    fn validate(&self, entity_type: &str, query: &Query) -> Result<(), EngineError> {
        if let Some(filter) = query.filter() {
            for property in filter.properties() {
                self.catalog.ensure_indexed(entity_type, property)?;
            }
        }
        for sort in query.sorts() {
            self.catalog.ensure_indexed(entity_type, &sort.property)?;
        }

        Ok(())
    }

    fn decode_cursor(
        &self,
        query: &Query,
        signature: &QuerySignature,
    ) -> Result<Option<CursorToken>, EngineError> {
        match query.cursor() {
            None => Ok(None),
            Some(text) => match CursorToken::decode(text, signature) {
                Ok(token) => Ok(Some(token)),
                Err(err) => {
                    self.counters.record_invalid_cursor();
                    Err(err.into())
                }
            },
        }
    }

    fn resolve(&self, scope: &Scope, id: &EntityId) -> Result<Option<Entity>, EngineError> {
        let entity = self
            .retry
            .run(|| self.entities.get(scope, id), || {
                self.counters.record_transient_retry();
            })?;
        Ok(entity)
    }

    fn drain_members(
        &self,
        scope: &Scope,
        owner: &EntityId,
        collection: &str,
    ) -> Result<Vec<EntityId>, EngineError> {
        let mut out = Vec::new();
        let mut anchor: Option<EntityId> = None;

        loop {
            let page = self.retry.run(
                || {
                    self.membership.members(
                        scope,
                        owner,
                        collection,
                        anchor.as_ref(),
                        PULL_BATCH,
                        false,
                    )
                },
                || self.counters.record_transient_retry(),
            )?;

            out.extend(page.ids.iter().cloned());
            if page.exhausted {
                break;
            }
            let Some(last) = page.ids.last().cloned() else {
                break;
            };
            anchor = Some(last);
        }

        Ok(out)
    }

    fn drain_connected(
        &self,
        scope: &Scope,
        source: &EntityId,
        connection_type: &str,
    ) -> Result<Vec<EntityId>, EngineError> {
        let mut out = Vec::new();
        let mut anchor: Option<EntityId> = None;

        loop {
            let page = self.retry.run(
                || {
                    self.membership.connected(
                        scope,
                        source,
                        connection_type,
                        anchor.as_ref(),
                        PULL_BATCH,
                        false,
                    )
                },
                || self.counters.record_transient_retry(),
            )?;

            out.extend(page.ids.iter().cloned());
            if page.exhausted {
                break;
            }
            let Some(last) = page.ids.last().cloned() else {
                break;
            };
            anchor = Some(last);
        }

        Ok(out)
    }

    /// Position candidates in result order. Sorted queries resolve each
    /// candidate to read its sort keys; unsorted queries order by id alone.
    fn order_rows(
        &self,
        scope: &Scope,
        candidates: Vec<EntityId>,
        query: &Query,
    ) -> Result<Vec<OrderedRow>, EngineError> {
        let sorts = query.sorts();

        let mut rows = Vec::with_capacity(candidates.len());
        for id in candidates {
            let sort_values = if sorts.is_empty() {
                Vec::new()
            } else {
                let Some(entity) = self.resolve(scope, &id)? else {
                    continue;
                };
                sorts
                    .iter()
                    .map(|sort| {
                        entity
                            .property(&sort.property)
                            .cloned()
                            .unwrap_or(Value::Null)
                    })
                    .collect()
            };

            rows.push(OrderedRow { id, sort_values });
        }

        rows.sort_by(|a, b| cmp_rows(a, b, sorts, query.reversed()));
        Ok(rows)
    }

    /// Apply the cursor boundary, cut the page, mint the next cursor, and
    /// project the surviving rows.
    fn paginate(
        &self,
        scope: &Scope,
        rows: Vec<OrderedRow>,
        query: &Query,
        signature: &QuerySignature,
        token: Option<&CursorToken>,
    ) -> Result<Results, EngineError> {
        let sorts = query.sorts();
        let reversed = query.reversed();

        // resume strictly after the boundary; a deleted boundary row still
        // positions correctly because comparison is by key, not presence
        let remaining: Vec<OrderedRow> = match token {
            Some(token) => {
                let boundary = OrderedRow {
                    id: token.boundary.id.clone(),
                    sort_values: token.boundary.sort_values.clone(),
                };
                rows.into_iter()
                    .filter(|row| cmp_rows(row, &boundary, sorts, reversed) == Ordering::Greater)
                    .collect()
            }
            None => rows,
        };

        let limit = query.limit();
        let more = remaining.len() > limit;
        let page: Vec<OrderedRow> = remaining.into_iter().take(limit).collect();

        let cursor = if more {
            match page.last() {
                Some(last) => {
                    let next = CursorToken {
                        boundary: Boundary {
                            sort_values: last.sort_values.clone(),
                            id: last.id.clone(),
                        },
                        leaf_anchors: Vec::new(),
                    };
                    Some(next.encode(signature)?)
                }
                None => None,
            }
        } else {
            None
        };

        let rows = self.project(scope, query.projection(), &page)?;
        self.counters.record_page();

        Ok(Results::new(rows, cursor))
    }

    fn project(
        &self,
        scope: &Scope,
        projection: &Projection,
        page: &[OrderedRow],
    ) -> Result<Vec<ResultRow>, EngineError> {
        let mut out = Vec::with_capacity(page.len());

        for row in page {
            let Some(entity) = self.resolve(scope, &row.id)? else {
                // deleted between ordering and projection
                continue;
            };

            let result = match projection {
                Projection::All => ResultRow::Entity(entity),
                Projection::Fields(paths) => {
                    let mut map = PropertyMap::new();
                    for path in paths {
                        let value = entity.property(path).cloned().unwrap_or(Value::Null);
                        map.set(path.clone(), value);
                    }
                    ResultRow::Projected(map)
                }
                Projection::Aliased(pairs) => {
                    let mut map = PropertyMap::new();
                    for (alias, path) in pairs {
                        let value = entity.property(path).cloned().unwrap_or(Value::Null);
                        map.set(alias.clone(), value);
                    }
                    ResultRow::Projected(map)
                }
            };

            out.push(result);
        }

        Ok(out)
    }

    /// The incremental fast path: one equality leaf, creation order,
    /// forward direction. Resumes from the leaf's scan anchor when the
    /// token carries one; otherwise falls back to the materialized path.
    #[expect(clippy::too_many_arguments)]
    fn try_incremental_equality(
        &self,
        scope: &Scope,
        owner: &EntityId,
        collection: &str,
        entity_type: &str,
        query: &Query,
        signature: &QuerySignature,
        token: Option<&CursorToken>,
    ) -> Result<Option<Results>, EngineError> {
        if !query.sorts().is_empty() || query.reversed() {
            return Ok(None);
        }
        let Some(FilterExpr::Compare(leaf)) = query.filter() else {
            return Ok(None);
        };
        if leaf.op != CompareOp::Eq {
            return Ok(None);
        }
        let resume = match token {
            None => None,
            Some(token) => match token.leaf_anchors.first() {
                Some(Some(anchor)) => Some(anchor.clone()),
                // token minted by the materialized path; stay on it
                _ => return Ok(None),
            },
        };

        let limit = query.limit();
        let mut matched: Vec<(EntityId, ScanAnchor)> = Vec::new();
        let mut anchor = resume;

        'outer: loop {
            let page = self.retry.run(
                || {
                    self.index.scan_equals(
                        scope,
                        entity_type,
                        &leaf.property,
                        &leaf.value,
                        anchor.as_ref(),
                        PULL_BATCH,
                        false,
                    )
                },
                || self.counters.record_transient_retry(),
            )?;
            self.counters.record_index_scan();

            for hit in &page.hits {
                let member = self.retry.run(
                    || self.membership.is_member(scope, owner, collection, &hit.id),
                    || self.counters.record_transient_retry(),
                )?;
                if !member {
                    continue;
                }

                matched.push((hit.id.clone(), hit.anchor.clone()));
                if matched.len() > limit {
                    break 'outer;
                }
            }

            if page.exhausted {
                break;
            }
            let Some(last) = page.last_anchor().cloned() else {
                break;
            };
            anchor = Some(last);
        }

        let more = matched.len() > limit;
        matched.truncate(limit);

        let cursor = if more {
            match matched.last() {
                Some((id, last_anchor)) => {
                    let next = CursorToken {
                        boundary: Boundary {
                            sort_values: Vec::new(),
                            id: id.clone(),
                        },
                        leaf_anchors: vec![Some(last_anchor.clone())],
                    };
                    Some(next.encode(signature)?)
                }
                None => None,
            }
        } else {
            None
        };

        let page_rows: Vec<OrderedRow> = matched
            .into_iter()
            .map(|(id, _)| OrderedRow {
                id,
                sort_values: Vec::new(),
            })
            .collect();

        let rows = self.project(scope, query.projection(), &page_rows)?;
        self.counters.record_page();

        Ok(Some(Results::new(rows, cursor)))
    }
}

fn flatten_entity(entity: &Entity) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    for (name, value) in entity.properties().iter() {
        flatten_indexable(name, value, &mut out);
    }
    out
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}
