//! Module: unique::index
//! Responsibility: the engine-facing unique value surface — write, load,
//! release, and the per-entity audit listing — over any reservation store.

use crate::{
    clock::Clock,
    error::{DuplicateValueError, EngineError},
    obs::EngineCounters,
    types::{EntityId, Scope},
    unique::{
        store::{CasOutcome, UniqueValueStore},
        value::UniqueValue,
    },
    value::Value,
};
use std::{collections::BTreeMap, sync::Arc};

///
/// UniqueValueIndex
///
/// Ties the store to a clock so expiry is testable, and maps a lost swap to
/// the duplicate error the engine surfaces. An optional default TTL applies
/// to every reservation written through this index.
///

pub struct UniqueValueIndex {
    store: Arc<dyn UniqueValueStore>,
    clock: Arc<dyn Clock>,
    default_ttl_ms: Option<u64>,
    counters: Option<Arc<EngineCounters>>,
}

impl UniqueValueIndex {
    #[must_use]
    pub fn new(store: Arc<dyn UniqueValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            default_ttl_ms: None,
            counters: None,
        }
    }

    #[must_use]
    pub const fn with_default_ttl(mut self, ttl_ms: u64) -> Self {
        self.default_ttl_ms = Some(ttl_ms);
        self
    }

    /// Report collisions into a shared counter set.
    #[must_use]
    pub fn with_counters(mut self, counters: Arc<EngineCounters>) -> Self {
        self.counters = Some(counters);
        self
    }

    /// Reserve `(entity_type, field, value)` for `owner`. A collision with
    /// a different live owner fails the whole operation; nothing is
    /// mutated.
    pub fn write(
        &self,
        scope: &Scope,
        entity_type: &str,
        field: &str,
        value: Value,
        owner: EntityId,
        version: u64,
    ) -> Result<(), EngineError> {
        self.write_with_ttl(scope, entity_type, field, value, owner, version, self.default_ttl_ms)
    }

    #[expect(clippy::too_many_arguments)]
    pub fn write_with_ttl(
        &self,
        scope: &Scope,
        entity_type: &str,
        field: &str,
        value: Value,
        owner: EntityId,
        version: u64,
        ttl_ms: Option<u64>,
    ) -> Result<(), EngineError> {
        let now = self.clock.now_ms();
        let mut candidate = UniqueValue::new(entity_type, field, value, owner, version);
        if let Some(ttl) = ttl_ms {
            candidate = candidate.with_expiry(now.saturating_add(ttl));
        }

        match self.store.compare_and_swap_active(scope, &candidate, now)? {
            CasOutcome::Written | CasOutcome::Unchanged => Ok(()),
            CasOutcome::Lost { current_owner } => {
                if let Some(counters) = &self.counters {
                    counters.record_unique_conflict();
                }
                Err(DuplicateValueError {
                    entity_type: candidate.entity_type,
                    field: candidate.field,
                    value: candidate.value,
                    existing_owner: current_owner,
                }
                .into())
            }
        }
    }

    /// Resolve the owning entity id for a value, if a live reservation
    /// exists.
    pub fn load(
        &self,
        scope: &Scope,
        entity_type: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<EntityId>, EngineError> {
        let now = self.clock.now_ms();
        let active = self.store.active(scope, entity_type, field, value, now)?;

        Ok(active.map(|reservation| reservation.owner))
    }

    /// Resolve the active reservations for a batch of `(field, value)`
    /// probes at once, keyed by field. Fields with no live reservation are
    /// absent from the result.
    pub fn load_fields(
        &self,
        scope: &Scope,
        entity_type: &str,
        probes: &[(String, Value)],
    ) -> Result<BTreeMap<String, UniqueValue>, EngineError> {
        let now = self.clock.now_ms();

        let mut out = BTreeMap::new();
        for (field, value) in probes {
            if let Some(active) = self.store.active(scope, entity_type, field, value, now)? {
                out.insert(field.clone(), active);
            }
        }

        Ok(out)
    }

    /// Release a reservation held by `owner`. Safe against stale callers:
    /// a newer owner's reservation is left alone.
    pub fn delete(
        &self,
        scope: &Scope,
        entity_type: &str,
        field: &str,
        value: &Value,
        owner: &EntityId,
    ) -> Result<(), EngineError> {
        self.store
            .retire_active(scope, entity_type, field, value, owner)?;
        Ok(())
    }

    /// The full history of every unique value an entity has held, newest
    /// version first. Releasing or superseding a value never removes it
    /// from this listing.
    pub fn get_all_unique_fields(
        &self,
        scope: &Scope,
        id: &EntityId,
    ) -> Result<Vec<UniqueValue>, EngineError> {
        let now = self.clock.now_ms();
        let held = self.store.held_by(scope, id, now)?;
        Ok(held)
    }
}
