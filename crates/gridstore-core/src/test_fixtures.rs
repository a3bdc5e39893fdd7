//! Shared test harness: an engine wired to the in-memory stores, with
//! entity lifecycle helpers that keep index, membership, and body in step.

use crate::{
    clock::ManualClock,
    entity::{Entity, PropertyMap},
    executor::{Engine, MemoryEntityStore},
    index::MemoryIndexStore,
    membership::{MembershipStore, MemoryMembershipStore},
    query::{Query, singularize},
    response::Results,
    types::{EntityId, IdGenerator, Scope},
    unique::{MemoryUniqueValueStore, UniqueValueIndex},
    value::Value,
};
use std::sync::Arc;

pub(crate) struct Harness {
    pub engine: Engine,
    pub store: Arc<MemoryEntityStore>,
    pub membership: Arc<MemoryMembershipStore>,
    pub clock: Arc<ManualClock>,
    pub ids: IdGenerator,
    pub scope: Scope,
    pub app: EntityId,
}

impl Harness {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(1_000));
        let store = Arc::new(MemoryEntityStore::new());
        let membership = Arc::new(MemoryMembershipStore::new());
        let unique = UniqueValueIndex::new(Arc::new(MemoryUniqueValueStore::new()), clock.clone());
        let engine = Engine::new(
            Arc::new(MemoryIndexStore::new()),
            membership.clone(),
            store.clone(),
            unique,
        );

        let ids = IdGenerator::new(clock.clone());
        let app = ids.next("application");

        Self {
            engine,
            store,
            membership,
            clock,
            ids,
            scope: Scope::new("test-app"),
            app,
        }
    }

    /// Create an entity in a collection: body stored, properties indexed,
    /// membership recorded. Sets a "created" property from the id's
    /// timestamp, and ticks the clock so creation times stay distinct.
    pub fn create(&self, collection: &str, pairs: &[(&str, Value)]) -> Entity {
        self.clock.advance_ms(1);

        let kind = singularize(collection);
        let id = self.ids.next(kind);

        let mut properties = PropertyMap::new();
        let created = i64::try_from(id.created_ms()).unwrap_or(i64::MAX);
        properties.set("created", Value::Int(created));
        for (name, value) in pairs {
            properties.set((*name).to_string(), value.clone());
        }

        let entity = Entity::new(id, properties);
        self.store.put(&self.scope, entity.clone());
        self.engine.index_entity(&self.scope, &entity).unwrap();
        self.membership
            .add_to_collection(&self.scope, &self.app, collection, entity.id())
            .unwrap();

        entity
    }

    /// Delete: purge index rows and edges, then drop the body.
    pub fn delete(&self, entity: &Entity) {
        self.engine.purge_entity(&self.scope, entity).unwrap();
        self.store.remove(&self.scope, entity.id());
    }

    /// Update one property, keeping index rows consistent.
    pub fn update(&self, entity: &mut Entity, name: &str, value: Value) {
        self.engine.deindex_entity(&self.scope, entity).unwrap();
        entity.set_property(name.to_string(), value);
        self.store.put(&self.scope, entity.clone());
        self.engine.index_entity(&self.scope, entity).unwrap();
    }

    pub fn connect(&self, source: &Entity, connection_type: &str, target: &Entity) {
        self.membership
            .connect(&self.scope, source.id(), connection_type, target.id())
            .unwrap();
    }

    pub fn search(&self, collection: &str, query: &Query) -> Results {
        self.engine
            .search_collection(&self.scope, &self.app, collection, query)
            .unwrap()
    }

    /// Page through a query until the cursor runs out, collecting ids.
    pub fn drain(&self, collection: &str, query: &Query) -> Vec<EntityId> {
        let mut out = Vec::new();
        let mut current = query.clone();

        loop {
            let results = self.search(collection, &current);
            out.extend(results.entities().map(|e| e.id().clone()));

            match results.cursor() {
                Some(cursor) => current = query.clone().set_cursor(cursor),
                None => break,
            }
        }

        out
    }
}
