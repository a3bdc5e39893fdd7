//! Module: entity
//! Responsibility: the entity property bag, dotted-path lookup, and typed
//! subtype views.
//! Does not own: persistence, index maintenance, or CRUD plumbing.

use crate::{types::EntityId, value::Value};
use serde::{Deserialize, Serialize};

///
/// PropertyMap
///
/// Insertion-ordered name→value mapping. Kept as a pair list rather than a
/// hash map so property order survives round trips and projection output is
/// deterministic.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PropertyMap(Vec<(String, Value)>);

impl PropertyMap {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0
            .iter()
            .find_map(|(k, v)| (k == name).then_some(v))
    }

    /// Insert or replace; replacement keeps the original position.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            self.0.push((name, value));
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let pos = self.0.iter().position(|(k, _)| k == name)?;
        Some(self.0.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(String, Value)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.set(k, v);
        }
        map
    }
}

///
/// Entity
///
/// Typed property bag identified by a stable id. The query/index core only
/// ever operates on this base shape; specialized records are accessed
/// through [`TypedView`].
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Entity {
    id: EntityId,
    properties: PropertyMap,
    version: u64,
}

impl Entity {
    #[must_use]
    pub fn new(id: EntityId, properties: PropertyMap) -> Self {
        Self {
            id,
            properties,
            version: 1,
        }
    }

    #[must_use]
    pub const fn id(&self) -> &EntityId {
        &self.id
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        self.id.kind()
    }

    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub const fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    /// Resolve a possibly dotted property path, traversing nested maps
    /// (`actor.displayName`). Returns `None` when any segment is absent.
    #[must_use]
    pub fn property(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.properties.get(segments.next()?)?;

        for segment in segments {
            let Value::Map(pairs) = current else {
                return None;
            };
            current = pairs.iter().find_map(|(k, v)| (k == segment).then_some(v))?;
        }

        Some(current)
    }

    /// Replace one property and bump the version counter. Index maintenance
    /// for the touched property is the surrounding layer's contract.
    pub fn set_property(&mut self, name: impl Into<String>, value: Value) {
        self.properties.set(name, value);
        self.version += 1;
    }

    /// Access this entity through a typed view, if the kinds match.
    #[must_use]
    pub fn view<V: TypedView>(&self) -> Option<V> {
        (self.kind() == V::KIND).then(|| V::from_entity(self)).flatten()
    }
}

///
/// TypedView
///
/// Capability-tagged read view over a base entity (a "user" record over a
/// `user` entity). Views never extend the entity shape; they only interpret
/// it.
///

pub trait TypedView: Sized {
    const KIND: &'static str;

    fn from_entity(entity: &Entity) -> Option<Self>;
}

///
/// TESTS
///
