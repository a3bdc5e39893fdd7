//! Module: index::memory
//! Responsibility: in-memory reference implementation of [`IndexStore`] over
//! an ordered row map, with debug-build row fingerprints.
//! Does not own: the scan contract (store.rs defines it).

use crate::{
    error::TransientStoreError,
    index::{
        IndexKey, IndexKind,
        store::{IndexStore, RangeBound, ScanAnchor, ScanHit, ScanPage},
    },
    types::{EntityId, Scope},
    value::Value,
};
use std::{
    collections::BTreeMap,
    ops::Bound,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

///
/// EntryState
///
/// Row payload: the writer's entity version plus a tombstone flag. Retired
/// rows stay in place so stale writes can be detected by version.
///

#[derive(Clone, Copy, Debug)]
struct EntryState {
    version: u64,
    retired: bool,
    #[cfg(debug_assertions)]
    fingerprint: u64,
}

impl EntryState {
    fn new(key: &IndexKey, version: u64, retired: bool) -> Self {
        Self {
            version,
            retired,
            #[cfg(debug_assertions)]
            fingerprint: fingerprint(key, version, retired),
        }
    }
}

#[cfg(debug_assertions)]
fn fingerprint(key: &IndexKey, version: u64, retired: bool) -> u64 {
    let mut bytes = crate::serialize::serialize(key).unwrap_or_default();
    bytes.extend_from_slice(&version.to_be_bytes());
    bytes.push(u8::from(retired));

    xxhash_rust::xxh3::xxh3_64(&bytes)
}

///
/// MemoryIndexStore
///
/// BTreeMap-backed index rows. The map's key order is the index order, so
/// scans are plain range iterations. Used directly in tests and as the
/// default store for embedded runs.
///

#[derive(Default)]
pub struct MemoryIndexStore {
    rows: RwLock<BTreeMap<IndexKey, EntryState>>,
}

impl MemoryIndexStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read_rows(&self) -> RwLockReadGuard<'_, BTreeMap<IndexKey, EntryState>> {
        self.rows.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_rows(&self) -> RwLockWriteGuard<'_, BTreeMap<IndexKey, EntryState>> {
        self.rows.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn upsert(rows: &mut BTreeMap<IndexKey, EntryState>, key: IndexKey, version: u64) {
        if let Some(existing) = rows.get(&key) {
            // stale writers lose
            if existing.version > version {
                return;
            }
        }

        let state = EntryState::new(&key, version, false);
        rows.insert(key, state);
    }

    fn retire(rows: &mut BTreeMap<IndexKey, EntryState>, key: &IndexKey, version: u64) {
        let Some(existing) = rows.get(key) else {
            return;
        };
        if existing.version > version {
            return;
        }

        let state = EntryState::new(key, version, true);
        rows.insert(key.clone(), state);
    }

    /// Pull up to `limit` live rows out of one key window, in key order or
    /// its exact reverse. `exhausted` is precise: false only when a further
    /// live row was actually seen.
    fn scan_window(
        &self,
        start: Bound<IndexKey>,
        end: Bound<IndexKey>,
        limit: usize,
        reversed: bool,
    ) -> ScanPage {
        let rows = self.read_rows();
        let mut hits = Vec::new();
        let mut exhausted = true;

        let iter: Box<dyn Iterator<Item = (&IndexKey, &EntryState)>> = if reversed {
            Box::new(rows.range((start, end)).rev())
        } else {
            Box::new(rows.range((start, end)))
        };

        for (key, state) in iter {
            #[cfg(debug_assertions)]
            debug_assert_eq!(
                state.fingerprint,
                fingerprint(key, state.version, state.retired),
                "index row fingerprint mismatch"
            );

            if state.retired {
                continue;
            }
            if hits.len() >= limit {
                exhausted = false;
                break;
            }

            hits.push(ScanHit {
                id: key.id.clone(),
                anchor: ScanAnchor {
                    value: key.value.clone(),
                    id: key.id.clone(),
                },
            });
        }

        ScanPage { hits, exhausted }
    }
}

fn anchor_key(
    scope: &Scope,
    entity_type: &str,
    property: &str,
    kind: IndexKind,
    anchor: &ScanAnchor,
) -> IndexKey {
    IndexKey::new(
        scope,
        entity_type,
        property,
        kind,
        anchor.value.clone(),
        anchor.id.clone(),
    )
}

impl IndexStore for MemoryIndexStore {
    fn put(
        &self,
        scope: &Scope,
        entity_type: &str,
        property: &str,
        value: &Value,
        id: &EntityId,
        version: u64,
    ) -> Result<(), TransientStoreError> {
        debug_assert!(value.is_indexable_scalar(), "index rows hold scalars only");

        let mut rows = self.write_rows();

        let value_key = IndexKey::new(
            scope,
            entity_type,
            property,
            IndexKind::Value,
            value.clone(),
            id.clone(),
        );
        Self::upsert(&mut rows, value_key, version);

        for token in value.tokens() {
            let token_key = IndexKey::new(
                scope,
                entity_type,
                property,
                IndexKind::Token,
                Value::Text(token),
                id.clone(),
            );
            Self::upsert(&mut rows, token_key, version);
        }

        Ok(())
    }

    fn remove(
        &self,
        scope: &Scope,
        entity_type: &str,
        property: &str,
        value: &Value,
        id: &EntityId,
        version: u64,
    ) -> Result<(), TransientStoreError> {
        let mut rows = self.write_rows();

        let value_key = IndexKey::new(
            scope,
            entity_type,
            property,
            IndexKind::Value,
            value.clone(),
            id.clone(),
        );
        Self::retire(&mut rows, &value_key, version);

        for token in value.tokens() {
            let token_key = IndexKey::new(
                scope,
                entity_type,
                property,
                IndexKind::Token,
                Value::Text(token),
                id.clone(),
            );
            Self::retire(&mut rows, &token_key, version);
        }

        Ok(())
    }

    fn scan_equals(
        &self,
        scope: &Scope,
        entity_type: &str,
        property: &str,
        value: &Value,
        start_after: Option<&ScanAnchor>,
        limit: usize,
        reversed: bool,
    ) -> Result<ScanPage, TransientStoreError> {
        let kind = IndexKind::Value;
        let run_floor = IndexKey::new(
            scope,
            entity_type,
            property,
            kind,
            value.clone(),
            EntityId::floor(),
        );
        let run_ceiling = IndexKey::new(
            scope,
            entity_type,
            property,
            kind,
            value.clone(),
            EntityId::ceiling(),
        );

        let (start, end) = match start_after {
            Some(anchor) => {
                let pivot = anchor_key(scope, entity_type, property, kind, anchor);
                if reversed {
                    (Bound::Included(run_floor), Bound::Excluded(pivot))
                } else {
                    (Bound::Excluded(pivot), Bound::Included(run_ceiling))
                }
            }
            None => (Bound::Included(run_floor), Bound::Included(run_ceiling)),
        };

        Ok(self.scan_window(start, end, limit, reversed))
    }

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
    ) -> Result<ScanPage, TransientStoreError> {
        let kind = IndexKind::Value;

        let mut start = match lower {
            Some(bound) if bound.inclusive => Bound::Included(IndexKey::new(
                scope,
                entity_type,
                property,
                kind,
                bound.value.clone(),
                EntityId::floor(),
            )),
            Some(bound) => Bound::Excluded(IndexKey::new(
                scope,
                entity_type,
                property,
                kind,
                bound.value.clone(),
                EntityId::ceiling(),
            )),
            None => Bound::Included(IndexKey::prefix_floor(scope, entity_type, property, kind)),
        };

        let mut end = match upper {
            Some(bound) if bound.inclusive => Bound::Included(IndexKey::new(
                scope,
                entity_type,
                property,
                kind,
                bound.value.clone(),
                EntityId::ceiling(),
            )),
            Some(bound) => Bound::Excluded(IndexKey::new(
                scope,
                entity_type,
                property,
                kind,
                bound.value.clone(),
                EntityId::floor(),
            )),
            None => Bound::Excluded(IndexKey::prefix_end(scope, entity_type, property, kind)),
        };

        if let Some(anchor) = start_after {
            let pivot = anchor_key(scope, entity_type, property, kind, anchor);
            if reversed {
                end = Bound::Excluded(pivot);
            } else {
                start = Bound::Excluded(pivot);
            }
        }

        Ok(self.scan_window(start, end, limit, reversed))
    }

    fn scan_contains(
        &self,
        scope: &Scope,
        entity_type: &str,
        property: &str,
        token: &str,
        start_after: Option<&ScanAnchor>,
        limit: usize,
        reversed: bool,
    ) -> Result<ScanPage, TransientStoreError> {
        let kind = IndexKind::Token;
        let needle = Value::Text(token.to_lowercase());

        let run_floor = IndexKey::new(
            scope,
            entity_type,
            property,
            kind,
            needle.clone(),
            EntityId::floor(),
        );
        let run_ceiling = IndexKey::new(
            scope,
            entity_type,
            property,
            kind,
            needle,
            EntityId::ceiling(),
        );

        let (start, end) = match start_after {
            Some(anchor) => {
                let pivot = anchor_key(scope, entity_type, property, kind, anchor);
                if reversed {
                    (Bound::Included(run_floor), Bound::Excluded(pivot))
                } else {
                    (Bound::Excluded(pivot), Bound::Included(run_ceiling))
                }
            }
            None => (Bound::Included(run_floor), Bound::Included(run_ceiling)),
        };

        Ok(self.scan_window(start, end, limit, reversed))
    }
}
