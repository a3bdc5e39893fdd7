//! Facade crate for the gridstore query/indexing engine.
//!
//! ## Crate layout
//! - `core`: values, entities, the secondary index, unique value
//!   reservations, the query language, and the cursor-paged executor.
//!
//! The `prelude` module mirrors the surface an embedding service uses.

pub use gridstore_core as core;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use gridstore_core::{
    DEFAULT_QUERY_LIMIT, MAX_QUERY_LIMIT, error::EngineError, executor::Engine,
};

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::core::{
        clock::{Clock as _, SystemClock},
        entity::{Entity, PropertyMap, TypedView},
        error::EngineError,
        executor::{Engine, EntityResolver, MemoryEntityStore},
        index::{IndexStore as _, MemoryIndexStore},
        membership::{MembershipStore as _, MemoryMembershipStore},
        query::{FilterExpr, Projection, Query, SortDirection, SortPredicate},
        response::{ResultRow, Results},
        types::{EntityId, IdGenerator, Scope},
        unique::{MemoryUniqueValueStore, UniqueValueIndex},
        value::Value,
    };
}

///
/// TESTS
///
