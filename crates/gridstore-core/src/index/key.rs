//! Module: index::key
//! Responsibility: ordered index row keys and their prefix bounds.
//! Does not own: entry state or scan semantics.

use crate::{
    types::{EntityId, Scope},
    value::Value,
};
use serde::{Deserialize, Serialize};

///
/// IndexKind
///
/// Value rows serve equality/range scans; token rows serve contains scans.
/// Both live in one ordered keyspace, discriminated here so a property's
/// value rows and token rows form separate contiguous runs.
///

#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum IndexKind {
    Value,
    Token,
}

///
/// IndexKey
///
/// One row per indexed property value per entity: ordered by
/// (scope, entity type, property, kind, value, entity id). Duplicate values
/// across entities order by id, which is creation order.
///

#[derive(Clone, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub struct IndexKey {
    pub scope: Scope,
    pub entity_type: String,
    pub property: String,
    pub kind: IndexKind,
    pub value: Value,
    pub id: EntityId,
}

impl IndexKey {
    #[must_use]
    pub fn new(
        scope: &Scope,
        entity_type: &str,
        property: &str,
        kind: IndexKind,
        value: Value,
        id: EntityId,
    ) -> Self {
        Self {
            scope: scope.clone(),
            entity_type: entity_type.to_string(),
            property: property.to_string(),
            kind,
            value,
            id,
        }
    }

    /// Smallest key of the (scope, type, property, kind) run.
    pub(crate) fn prefix_floor(
        scope: &Scope,
        entity_type: &str,
        property: &str,
        kind: IndexKind,
    ) -> Self {
        Self::new(
            scope,
            entity_type,
            property,
            kind,
            Value::Null,
            EntityId::floor(),
        )
    }

    /// Exclusive upper bound of the (scope, type, property, kind) run.
    pub(crate) fn prefix_end(
        scope: &Scope,
        entity_type: &str,
        property: &str,
        kind: IndexKind,
    ) -> Self {
        match kind {
            // value rows end where the property's token rows begin
            IndexKind::Value => Self::prefix_floor(scope, entity_type, property, IndexKind::Token),
            // token rows end at the successor property name
            IndexKind::Token => {
                let successor = format!("{property}\u{0}");
                Self::new(
                    scope,
                    entity_type,
                    &successor,
                    IndexKind::Value,
                    Value::Null,
                    EntityId::floor(),
                )
            }
        }
    }
}
