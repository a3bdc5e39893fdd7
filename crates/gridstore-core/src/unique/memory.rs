//! Module: unique::memory
//! Responsibility: in-memory reference implementation of the reservation
//! store. One lock guards each swap, standing in for a storage-level
//! conditional write.

use crate::{
    error::TransientStoreError,
    types::{EntityId, Scope},
    unique::{
        store::{CasOutcome, UniqueValueStore},
        value::UniqueValue,
    },
    value::Value,
};
use std::{
    collections::BTreeMap,
    sync::{PoisonError, RwLock},
};

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
struct SlotKey {
    scope: Scope,
    entity_type: String,
    field: String,
    value: Value,
}

impl SlotKey {
    fn new(scope: &Scope, entity_type: &str, field: &str, value: &Value) -> Self {
        Self {
            scope: scope.clone(),
            entity_type: entity_type.to_string(),
            field: field.to_string(),
            value: value.clone(),
        }
    }
}

///
/// Slot
///
/// Active reservation plus its full append-only history. History keeps
/// superseded and released reservations for audit reads.
///

#[derive(Clone, Debug, Default)]
struct Slot {
    active: Option<UniqueValue>,
    history: Vec<UniqueValue>,
}

///
/// MemoryUniqueValueStore
///

#[derive(Debug, Default)]
pub struct MemoryUniqueValueStore {
    slots: RwLock<BTreeMap<SlotKey, Slot>>,
}

impl MemoryUniqueValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl UniqueValueStore for MemoryUniqueValueStore {
    fn compare_and_swap_active(
        &self,
        scope: &Scope,
        candidate: &UniqueValue,
        now_ms: u64,
    ) -> Result<CasOutcome, TransientStoreError> {
        let key = SlotKey::new(scope, &candidate.entity_type, &candidate.field, &candidate.value);
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let slot = slots.entry(key).or_default();

        match &slot.active {
            Some(current) if !current.is_expired(now_ms) => {
                if current.owner == candidate.owner {
                    if candidate.version > current.version {
                        slot.active = Some(candidate.clone());
                        slot.history.push(candidate.clone());
                        Ok(CasOutcome::Written)
                    } else {
                        Ok(CasOutcome::Unchanged)
                    }
                } else {
                    Ok(CasOutcome::Lost {
                        current_owner: current.owner.clone(),
                    })
                }
            }
            _ => {
                slot.active = Some(candidate.clone());
                slot.history.push(candidate.clone());
                Ok(CasOutcome::Written)
            }
        }
    }

    fn active(
        &self,
        scope: &Scope,
        entity_type: &str,
        field: &str,
        value: &Value,
        now_ms: u64,
    ) -> Result<Option<UniqueValue>, TransientStoreError> {
        let key = SlotKey::new(scope, entity_type, field, value);
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);

        Ok(slots
            .get(&key)
            .and_then(|slot| slot.active.clone())
            .filter(|current| !current.is_expired(now_ms)))
    }

    fn retire_active(
        &self,
        scope: &Scope,
        entity_type: &str,
        field: &str,
        value: &Value,
        owner: &EntityId,
    ) -> Result<(), TransientStoreError> {
        let key = SlotKey::new(scope, entity_type, field, value);
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(slot) = slots.get_mut(&key) {
            if slot
                .active
                .as_ref()
                .is_some_and(|current| current.owner == *owner)
            {
                slot.active = None;
            }
        }

        Ok(())
    }

    fn held_by(
        &self,
        scope: &Scope,
        id: &EntityId,
        _now_ms: u64,
    ) -> Result<Vec<UniqueValue>, TransientStoreError> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);

        // the audit chain: every version the entity ever held, including
        // superseded, released, and expired reservations
        let mut held: Vec<UniqueValue> = slots
            .iter()
            .filter(|(key, _)| key.scope == *scope)
            .flat_map(|(_, slot)| slot.history.iter())
            .filter(|row| row.owner == *id)
            .cloned()
            .collect();

        held.sort_by(|a, b| b.version.cmp(&a.version).then_with(|| a.field.cmp(&b.field)));
        Ok(held)
    }
}
