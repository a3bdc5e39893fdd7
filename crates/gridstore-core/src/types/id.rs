//! Module: types::id
//! Responsibility: stable, time-orderable entity identifiers.
//! Does not own: entity storage or index row layout.

use crate::clock::Clock;
use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering as AtomicOrdering},
    },
};
use ulid::Ulid;

///
/// EntityId
///
/// Opaque, globally unique, time-orderable identifier: an entity kind plus a
/// ULID. Never reused. Id order is creation order because the ULID timestamp
/// leads the comparison.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct EntityId {
    kind: String,
    // CBOR integers cap at 64 bits, so the raw ULID crosses the wire as its
    // big-endian bytes
    #[serde(with = "raw_bytes")]
    raw: u128,
}

mod raw_bytes {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub(super) fn serialize<S: Serializer>(raw: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        raw.to_be_bytes().serialize(serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let bytes = <[u8; 16]>::deserialize(deserializer)?;
        Ok(u128::from_be_bytes(bytes))
    }
}

impl EntityId {
    #[must_use]
    pub fn from_parts(kind: impl Into<String>, ulid: Ulid) -> Self {
        Self {
            kind: kind.into(),
            raw: ulid.0,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub const fn ulid(&self) -> Ulid {
        Ulid(self.raw)
    }

    /// Millisecond creation timestamp embedded in the ULID.
    #[must_use]
    pub const fn created_ms(&self) -> u64 {
        Ulid(self.raw).timestamp_ms()
    }

    /// Smallest possible id, used as a scan range floor.
    #[must_use]
    pub(crate) const fn floor() -> Self {
        Self {
            kind: String::new(),
            raw: 0,
        }
    }

    /// Largest possible id, used as a scan range ceiling.
    #[must_use]
    pub(crate) fn ceiling() -> Self {
        Self {
            kind: "\u{10FFFF}".to_string(),
            raw: u128::MAX,
        }
    }
}

impl Ord for EntityId {
    fn cmp(&self, other: &Self) -> Ordering {
        // ULID first so id order is creation order; kind only breaks ties.
        self.raw
            .cmp(&other.raw)
            .then_with(|| self.kind.cmp(&other.kind))
    }
}

impl PartialOrd for EntityId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, Ulid(self.raw))
    }
}

///
/// IdGenerator
///
/// Clock-driven ULID generator. The random component is replaced by a
/// process-local monotonic counter so no rand dependency is pulled in and
/// ids minted within one millisecond still sort by mint order.
///

pub struct IdGenerator {
    clock: Arc<dyn Clock>,
    entropy: AtomicU64,
}

impl IdGenerator {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entropy: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub fn next(&self, kind: impl Into<String>) -> EntityId {
        let ts = self.clock.now_ms();
        let seq = self.entropy.fetch_add(1, AtomicOrdering::SeqCst);

        EntityId::from_parts(kind, Ulid::from_parts(ts, u128::from(seq)))
    }
}

///
/// TESTS
///
