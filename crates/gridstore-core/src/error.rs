//! Module: error
//! Responsibility: crate-level error surface and its class/origin taxonomy.
//! Does not own: module-local parse/serialize failures (those convert in).
//!
//! Structured fields (entity type, property name, owning id) survive
//! aggregation verbatim so callers can build precise user-facing messages.
//! No layer downgrades an error into an empty result.

use crate::{query::parse::ParseError, types::EntityId, value::Value};
use std::fmt;
use thiserror::Error as ThisError;

///
/// NotIndexedError
///
/// A filter, sort, or order-by referenced a property with no index for the
/// entity type. The malformed `order by asc` case reports the entity type
/// with an empty property name, not a parse failure.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("entity '{entity_type}' has no index for property '{property}'")]
pub struct NotIndexedError {
    pub entity_type: String,
    pub property: String,
}

impl NotIndexedError {
    #[must_use]
    pub fn new(entity_type: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            property: property.into(),
        }
    }
}

///
/// DuplicateValueError
///
/// A unique-value write collided with a different active owner. The write
/// performed no mutation; the entity mutation that triggered it must not
/// proceed.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error(
    "unique value already reserved: {entity_type}.{field} = {value} (owned by {existing_owner})"
)]
pub struct DuplicateValueError {
    pub entity_type: String,
    pub field: String,
    pub value: Value,
    pub existing_owner: EntityId,
}

///
/// InvalidCursorError
///
/// The cursor does not decode, or decodes against a materially different
/// query shape. A user error, distinct from an exhausted page; never
/// retried automatically.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum InvalidCursorError {
    #[error("failed to decode cursor: {0}")]
    Decode(String),

    #[error("unsupported cursor version: {version}")]
    UnsupportedVersion { version: u8 },

    #[error("cursor does not match this query shape")]
    SignatureMismatch,
}

///
/// TransientStoreError
///
/// Underlying store connectivity/timeout. Idempotent reads may be retried
/// with bounded backoff; conditional writes are side-effect-free on failure
/// and retried only by the caller.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("transient store failure: {message}")]
pub struct TransientStoreError {
    pub message: String,
}

impl TransientStoreError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

///
/// EngineError
///
/// Aggregated error surface of the query/index core. Leaf variants keep
/// their structured payloads; `class()`/`origin()` give the stable runtime
/// classification.
///

#[derive(Debug, ThisError)]
pub enum EngineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    NotIndexed(#[from] NotIndexedError),

    #[error(transparent)]
    Duplicate(#[from] Box<DuplicateValueError>),

    #[error(transparent)]
    InvalidCursor(#[from] InvalidCursorError),

    #[error(transparent)]
    Transient(#[from] TransientStoreError),

    #[error("{origin}: {message}")]
    Internal { origin: ErrorOrigin, message: String },

    #[error("corruption detected ({origin}): {message}")]
    Corruption { origin: ErrorOrigin, message: String },

    #[error("unsupported ({origin}): {message}")]
    Unsupported { origin: ErrorOrigin, message: String },
}

impl EngineError {
    #[must_use]
    pub fn internal(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::Internal {
            origin,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn corruption(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::Corruption {
            origin,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unsupported(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::Unsupported {
            origin,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Parse(_) => ErrorClass::Parse,
            Self::NotIndexed(_) => ErrorClass::NotIndexed,
            Self::Duplicate(_) => ErrorClass::Conflict,
            Self::InvalidCursor(_) => ErrorClass::InvalidCursor,
            Self::Transient(_) => ErrorClass::Transient,
            Self::Internal { .. } => ErrorClass::Internal,
            Self::Corruption { .. } => ErrorClass::Corruption,
            Self::Unsupported { .. } => ErrorClass::Unsupported,
        }
    }

    #[must_use]
    pub const fn origin(&self) -> ErrorOrigin {
        match self {
            Self::Parse(_) => ErrorOrigin::Parse,
            Self::NotIndexed(_) => ErrorOrigin::Query,
            Self::Duplicate(_) => ErrorOrigin::Unique,
            Self::InvalidCursor(_) => ErrorOrigin::Cursor,
            Self::Transient(_) => ErrorOrigin::Store,
            Self::Internal { origin, .. }
            | Self::Corruption { origin, .. }
            | Self::Unsupported { origin, .. } => *origin,
        }
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {self}", self.origin(), self.class())
    }
}

impl From<DuplicateValueError> for EngineError {
    fn from(err: DuplicateValueError) -> Self {
        Self::Duplicate(Box::new(err))
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Parse,
    NotIndexed,
    Conflict,
    InvalidCursor,
    Transient,
    Corruption,
    Internal,
    Unsupported,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Parse => "parse",
            Self::NotIndexed => "not_indexed",
            Self::Conflict => "conflict",
            Self::InvalidCursor => "invalid_cursor",
            Self::Transient => "transient",
            Self::Corruption => "corruption",
            Self::Internal => "internal",
            Self::Unsupported => "unsupported",
        };
        f.write_str(label)
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Parse,
    Query,
    Index,
    Unique,
    Membership,
    Cursor,
    Store,
    Executor,
    Serialize,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Parse => "parse",
            Self::Query => "query",
            Self::Index => "index",
            Self::Unique => "unique",
            Self::Membership => "membership",
            Self::Cursor => "cursor",
            Self::Store => "store",
            Self::Executor => "executor",
            Self::Serialize => "serialize",
        };
        f.write_str(label)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::{EngineError, ErrorClass, ErrorOrigin, NotIndexedError};

    #[test]
    fn not_indexed_keeps_structured_fields_through_aggregation() {
        let err = EngineError::from(NotIndexedError::new("user", ""));

        assert_eq!(err.class(), ErrorClass::NotIndexed);
        assert_eq!(err.origin(), ErrorOrigin::Query);

        let EngineError::NotIndexed(inner) = err else {
            panic!("expected NotIndexed variant");
        };
        assert_eq!(inner.entity_type, "user");
        assert_eq!(inner.property, "");
    }

    #[test]
    fn display_with_class_prefixes_origin_and_class() {
        let err = EngineError::internal(ErrorOrigin::Executor, "boom");
        assert_eq!(err.display_with_class(), "executor:internal: executor: boom");
    }
}
