//! Module: index::catalog
//! Responsibility: which (entity type, property) pairs carry an index, and
//! the fail-fast check queries run before touching the store.
//! Does not own: index rows or maintenance.

use crate::error::NotIndexedError;
use std::{
    collections::BTreeSet,
    sync::{PoisonError, RwLock},
};

///
/// IndexCatalog
///
/// Entities are schema-free, so every property is indexed by default and the
/// catalog records opt-outs. A query naming an unindexed property is
/// rejected whole before any index scan runs; it never degrades into a
/// partial result.
///

#[derive(Debug, Default)]
pub struct IndexCatalog {
    unindexed: RwLock<BTreeSet<(String, String)>>,
}

impl IndexCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opt a property out of indexing for one entity type.
    pub fn mark_unindexed(&self, entity_type: &str, property: &str) {
        self.unindexed
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((entity_type.to_string(), property.to_string()));
    }

    #[must_use]
    pub fn is_indexed(&self, entity_type: &str, property: &str) -> bool {
        // the empty property name can never name an index
        if property.is_empty() {
            return false;
        }

        !self
            .unindexed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(entity_type.to_string(), property.to_string()))
    }

    pub fn ensure_indexed(&self, entity_type: &str, property: &str) -> Result<(), NotIndexedError> {
        if self.is_indexed(entity_type, property) {
            Ok(())
        } else {
            Err(NotIndexedError::new(entity_type, property))
        }
    }
}
