//! Module: unique::store
//! Responsibility: the reservation store contract. The only write path is a
//! single-row conditional swap; there is no read-then-write window.

use crate::{
    error::TransientStoreError,
    types::{EntityId, Scope},
    unique::value::UniqueValue,
};

///
/// CasOutcome
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CasOutcome {
    /// The candidate is now the active reservation.
    Written,
    /// A different live owner holds the value; nothing was mutated.
    Lost { current_owner: EntityId },
    /// Same owner, no newer version; nothing to do.
    Unchanged,
}

///
/// UniqueValueStore
///

pub trait UniqueValueStore: Send + Sync {
    /// Atomically claim `(entity_type, field, value)` for the candidate's
    /// owner. Succeeds when the slot is free, expired as of `now_ms`, or
    /// already held by the same owner at an older version.
    fn compare_and_swap_active(
        &self,
        scope: &Scope,
        candidate: &UniqueValue,
        now_ms: u64,
    ) -> Result<CasOutcome, TransientStoreError>;

    /// The live reservation for a value, if any. Expired reservations read
    /// as absent.
    fn active(
        &self,
        scope: &Scope,
        entity_type: &str,
        field: &str,
        value: &crate::value::Value,
        now_ms: u64,
    ) -> Result<Option<UniqueValue>, TransientStoreError>;

    /// Release a reservation, but only if `owner` still holds it. A stale
    /// release against a newer owner is a no-op.
    fn retire_active(
        &self,
        scope: &Scope,
        entity_type: &str,
        field: &str,
        value: &crate::value::Value,
        owner: &EntityId,
    ) -> Result<(), TransientStoreError>;

    /// The persisted history of every unique value `id` has held, newest
    /// version first. Superseded, released, and expired reservations all
    /// appear; the chain is append-only.
    fn held_by(
        &self,
        scope: &Scope,
        id: &EntityId,
        now_ms: u64,
    ) -> Result<Vec<UniqueValue>, TransientStoreError>;
}
