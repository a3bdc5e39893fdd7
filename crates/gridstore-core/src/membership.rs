//! Module: membership
//! Responsibility: collection membership and directed entity connections,
//! as ordered edge sets with bounded paged reads.
//! Does not own: entity bodies or secondary indexes.

use crate::{
    error::TransientStoreError,
    types::{EntityId, Scope},
};
use std::{
    collections::BTreeSet,
    ops::Bound,
    sync::{PoisonError, RwLock},
};

///
/// LinkKind
///
/// Collections are named containment edges from an owner; connections are
/// named directed edges between peers ("likes", "follows"). Same edge
/// shape, different lifecycle: deleting an entity severs both directions.
///

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
enum LinkKind {
    Collection,
    Connection,
}

#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
struct EdgeKey {
    scope: Scope,
    source: EntityId,
    kind: LinkKind,
    name: String,
    target: EntityId,
}

///
/// MemberPage
///
/// One bounded pull of edge targets in id order (creation order).
/// `exhausted == false` means more targets remain past the last id.
///

#[derive(Clone, Debug, Default)]
pub struct MemberPage {
    pub ids: Vec<EntityId>,
    pub exhausted: bool,
}

///
/// MembershipStore
///
/// Edges are idempotent: re-adding an existing member is a no-op, removing
/// an absent one is a no-op. Paged reads never block writers.
///

pub trait MembershipStore: Send + Sync {
    fn add_to_collection(
        &self,
        scope: &Scope,
        owner: &EntityId,
        collection: &str,
        member: &EntityId,
    ) -> Result<(), TransientStoreError>;

    fn remove_from_collection(
        &self,
        scope: &Scope,
        owner: &EntityId,
        collection: &str,
        member: &EntityId,
    ) -> Result<(), TransientStoreError>;

    fn connect(
        &self,
        scope: &Scope,
        source: &EntityId,
        connection_type: &str,
        target: &EntityId,
    ) -> Result<(), TransientStoreError>;

    fn disconnect(
        &self,
        scope: &Scope,
        source: &EntityId,
        connection_type: &str,
        target: &EntityId,
    ) -> Result<(), TransientStoreError>;

    fn members(
        &self,
        scope: &Scope,
        owner: &EntityId,
        collection: &str,
        start_after: Option<&EntityId>,
        limit: usize,
        reversed: bool,
    ) -> Result<MemberPage, TransientStoreError>;

    fn connected(
        &self,
        scope: &Scope,
        source: &EntityId,
        connection_type: &str,
        start_after: Option<&EntityId>,
        limit: usize,
        reversed: bool,
    ) -> Result<MemberPage, TransientStoreError>;

    fn is_member(
        &self,
        scope: &Scope,
        owner: &EntityId,
        collection: &str,
        member: &EntityId,
    ) -> Result<bool, TransientStoreError>;

    /// Remove every edge that touches `id`, in either direction. Called on
    /// entity delete so no collection or connection can resurrect it.
    fn sever_all(&self, scope: &Scope, id: &EntityId) -> Result<(), TransientStoreError>;
}

///
/// MemoryMembershipStore
///
/// BTreeSet-backed edges; set order is (source, kind, name, target), so a
/// paged read is a range walk and target order is creation order.
///

#[derive(Debug, Default)]
pub struct MemoryMembershipStore {
    edges: RwLock<BTreeSet<EdgeKey>>,
}

impl MemoryMembershipStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, key: EdgeKey) {
        self.edges
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key);
    }

    fn remove(&self, key: &EdgeKey) {
        self.edges
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    fn page(
        &self,
        scope: &Scope,
        source: &EntityId,
        kind: LinkKind,
        name: &str,
        start_after: Option<&EntityId>,
        limit: usize,
        reversed: bool,
    ) -> MemberPage {
        let floor = EdgeKey {
            scope: scope.clone(),
            source: source.clone(),
            kind,
            name: name.to_string(),
            target: EntityId::floor(),
        };
        let ceiling = EdgeKey {
            target: EntityId::ceiling(),
            ..floor.clone()
        };

        let (start, end) = match start_after {
            Some(anchor) => {
                let pivot = EdgeKey {
                    target: anchor.clone(),
                    ..floor.clone()
                };
                if reversed {
                    (Bound::Included(floor), Bound::Excluded(pivot))
                } else {
                    (Bound::Excluded(pivot), Bound::Included(ceiling))
                }
            }
            None => (Bound::Included(floor), Bound::Included(ceiling)),
        };

        let edges = self.edges.read().unwrap_or_else(PoisonError::into_inner);
        let iter: Box<dyn Iterator<Item = &EdgeKey>> = if reversed {
            Box::new(edges.range((start, end)).rev())
        } else {
            Box::new(edges.range((start, end)))
        };

        let mut ids = Vec::new();
        let mut exhausted = true;
        for key in iter {
            if ids.len() >= limit {
                exhausted = false;
                break;
            }
            ids.push(key.target.clone());
        }

        MemberPage { ids, exhausted }
    }
}

impl MembershipStore for MemoryMembershipStore {
    fn add_to_collection(
        &self,
        scope: &Scope,
        owner: &EntityId,
        collection: &str,
        member: &EntityId,
    ) -> Result<(), TransientStoreError> {
        self.insert(EdgeKey {
            scope: scope.clone(),
            source: owner.clone(),
            kind: LinkKind::Collection,
            name: collection.to_string(),
            target: member.clone(),
        });
        Ok(())
    }

    fn remove_from_collection(
        &self,
        scope: &Scope,
        owner: &EntityId,
        collection: &str,
        member: &EntityId,
    ) -> Result<(), TransientStoreError> {
        self.remove(&EdgeKey {
            scope: scope.clone(),
            source: owner.clone(),
            kind: LinkKind::Collection,
            name: collection.to_string(),
            target: member.clone(),
        });
        Ok(())
    }

    fn connect(
        &self,
        scope: &Scope,
        source: &EntityId,
        connection_type: &str,
        target: &EntityId,
    ) -> Result<(), TransientStoreError> {
        self.insert(EdgeKey {
            scope: scope.clone(),
            source: source.clone(),
            kind: LinkKind::Connection,
            name: connection_type.to_string(),
            target: target.clone(),
        });
        Ok(())
    }

    fn disconnect(
        &self,
        scope: &Scope,
        source: &EntityId,
        connection_type: &str,
        target: &EntityId,
    ) -> Result<(), TransientStoreError> {
        self.remove(&EdgeKey {
            scope: scope.clone(),
            source: source.clone(),
            kind: LinkKind::Connection,
            name: connection_type.to_string(),
            target: target.clone(),
        });
        Ok(())
    }

    fn members(
        &self,
        scope: &Scope,
        owner: &EntityId,
        collection: &str,
        start_after: Option<&EntityId>,
        limit: usize,
        reversed: bool,
    ) -> Result<MemberPage, TransientStoreError> {
        Ok(self.page(
            scope,
            owner,
            LinkKind::Collection,
            collection,
            start_after,
            limit,
            reversed,
        ))
    }

    fn connected(
        &self,
        scope: &Scope,
        source: &EntityId,
        connection_type: &str,
        start_after: Option<&EntityId>,
        limit: usize,
        reversed: bool,
    ) -> Result<MemberPage, TransientStoreError> {
        Ok(self.page(
            scope,
            source,
            LinkKind::Connection,
            connection_type,
            start_after,
            limit,
            reversed,
        ))
    }

    fn is_member(
        &self,
        scope: &Scope,
        owner: &EntityId,
        collection: &str,
        member: &EntityId,
    ) -> Result<bool, TransientStoreError> {
        let key = EdgeKey {
            scope: scope.clone(),
            source: owner.clone(),
            kind: LinkKind::Collection,
            name: collection.to_string(),
            target: member.clone(),
        };

        Ok(self
            .edges
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&key))
    }

    fn sever_all(&self, scope: &Scope, id: &EntityId) -> Result<(), TransientStoreError> {
        let mut edges = self.edges.write().unwrap_or_else(PoisonError::into_inner);
        edges.retain(|key| {
            key.scope != *scope || (key.source != *id && key.target != *id)
        });
        Ok(())
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::{MembershipStore, MemoryMembershipStore};
    use crate::{
        clock::ManualClock,
        types::{EntityId, IdGenerator, Scope},
    };
    use std::sync::Arc;

    fn scope() -> Scope {
        Scope::new("app-1")
    }

    fn generator() -> IdGenerator {
        IdGenerator::new(Arc::new(ManualClock::new(500)))
    }

    #[test]
    fn members_page_in_creation_order() {
        let store = MemoryMembershipStore::new();
        let ids = generator();
        let owner = ids.next("application");
        let users: Vec<EntityId> = (0..5).map(|_| ids.next("user")).collect();

        for user in &users {
            store
                .add_to_collection(&scope(), &owner, "users", user)
                .unwrap();
        }

        let first = store
            .members(&scope(), &owner, "users", None, 3, false)
            .unwrap();
        assert_eq!(first.ids, users[..3]);
        assert!(!first.exhausted);

        let rest = store
            .members(&scope(), &owner, "users", Some(&first.ids[2]), 10, false)
            .unwrap();
        assert_eq!(rest.ids, users[3..]);
        assert!(rest.exhausted);
    }

    #[test]
    fn add_is_idempotent_and_remove_is_safe_when_absent() {
        let store = MemoryMembershipStore::new();
        let ids = generator();
        let owner = ids.next("application");
        let user = ids.next("user");

        store
            .add_to_collection(&scope(), &owner, "users", &user)
            .unwrap();
        store
            .add_to_collection(&scope(), &owner, "users", &user)
            .unwrap();

        let page = store
            .members(&scope(), &owner, "users", None, 10, false)
            .unwrap();
        assert_eq!(page.ids, vec![user.clone()]);

        store
            .remove_from_collection(&scope(), &owner, "users", &user)
            .unwrap();
        store
            .remove_from_collection(&scope(), &owner, "users", &user)
            .unwrap();

        let page = store
            .members(&scope(), &owner, "users", None, 10, false)
            .unwrap();
        assert!(page.ids.is_empty());
    }

    #[test]
    fn connections_are_directed_and_typed() {
        let store = MemoryMembershipStore::new();
        let ids = generator();
        let alice = ids.next("user");
        let bob = ids.next("user");

        store.connect(&scope(), &alice, "likes", &bob).unwrap();

        let likes = store
            .connected(&scope(), &alice, "likes", None, 10, false)
            .unwrap();
        assert_eq!(likes.ids, vec![bob.clone()]);

        // not symmetric, not shared across connection types
        let reverse = store
            .connected(&scope(), &bob, "likes", None, 10, false)
            .unwrap();
        assert!(reverse.ids.is_empty());

        let follows = store
            .connected(&scope(), &alice, "follows", None, 10, false)
            .unwrap();
        assert!(follows.ids.is_empty());
    }

    #[test]
    fn sever_all_removes_both_directions() {
        let store = MemoryMembershipStore::new();
        let ids = generator();
        let owner = ids.next("application");
        let alice = ids.next("user");
        let bob = ids.next("user");

        store
            .add_to_collection(&scope(), &owner, "users", &alice)
            .unwrap();
        store.connect(&scope(), &alice, "likes", &bob).unwrap();
        store.connect(&scope(), &bob, "likes", &alice).unwrap();

        store.sever_all(&scope(), &alice).unwrap();

        assert!(
            store
                .members(&scope(), &owner, "users", None, 10, false)
                .unwrap()
                .ids
                .is_empty()
        );
        assert!(
            store
                .connected(&scope(), &bob, "likes", None, 10, false)
                .unwrap()
                .ids
                .is_empty()
        );
    }
}
