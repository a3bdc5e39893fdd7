//! Module: executor::store
//! Responsibility: resolving candidate ids back into entity bodies, and the
//! in-memory entity store used by embedded runs and tests.

use crate::{
    entity::Entity,
    error::TransientStoreError,
    types::{EntityId, Scope},
};
use std::{
    collections::BTreeMap,
    sync::{PoisonError, RwLock},
};

///
/// EntityResolver
///
/// Read-only lookup from id to entity body. The engine treats a missing
/// body as "deleted since the index was read" and drops the row.
///

pub trait EntityResolver: Send + Sync {
    fn get(&self, scope: &Scope, id: &EntityId) -> Result<Option<Entity>, TransientStoreError>;
}

///
/// MemoryEntityStore
///

#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    entities: RwLock<BTreeMap<(Scope, EntityId), Entity>>,
}

impl MemoryEntityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, scope: &Scope, entity: Entity) {
        self.entities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((scope.clone(), entity.id().clone()), entity);
    }

    pub fn remove(&self, scope: &Scope, id: &EntityId) -> Option<Entity> {
        self.entities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(scope.clone(), id.clone()))
    }
}

impl EntityResolver for MemoryEntityStore {
    fn get(&self, scope: &Scope, id: &EntityId) -> Result<Option<Entity>, TransientStoreError> {
        Ok(self
            .entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(scope.clone(), id.clone()))
            .cloned())
    }
}
