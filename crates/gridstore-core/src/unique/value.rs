//! Module: unique::value
//! Responsibility: the reservation record itself.

use crate::{types::EntityId, value::Value};
use serde::{Deserialize, Serialize};

///
/// UniqueValue
///
/// One reservation: this (entity type, field, value) belongs to `owner` as
/// of `version`. `expires_at` is an absolute millisecond deadline; an
/// expired reservation is reclaimable but stays in history.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct UniqueValue {
    pub entity_type: String,
    pub field: String,
    pub value: Value,
    pub owner: EntityId,
    pub version: u64,
    pub expires_at: Option<u64>,
}

impl UniqueValue {
    #[must_use]
    pub fn new(
        entity_type: impl Into<String>,
        field: impl Into<String>,
        value: Value,
        owner: EntityId,
        version: u64,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            field: field.into(),
            value,
            owner,
            version,
            expires_at: None,
        }
    }

    #[must_use]
    pub const fn with_expiry(mut self, expires_at: u64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    #[must_use]
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at.is_some_and(|deadline| now_ms >= deadline)
    }
}
