//! Core runtime for gridstore: values, entity property bags, the secondary
//! index store, the unique-value reservation index, the query language, the
//! planner/evaluator, and cursor-paged results.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod clock;
pub mod cursor;
pub mod entity;
pub mod error;
pub mod executor;
pub mod index;
pub mod membership;
pub mod obs;
pub mod query;
pub mod response;
pub mod retry;
pub mod serialize;
pub mod types;
pub mod unique;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// CONSTANTS
///

/// Default page size when a query does not set an explicit limit.
pub const DEFAULT_QUERY_LIMIT: usize = 10;

/// Hard cap on a single page, applied to caller-provided limits.
pub const MAX_QUERY_LIMIT: usize = 1_000;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No stores, serializers, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        entity::Entity,
        error::EngineError,
        query::{Query, SortDirection},
        response::Results,
        types::{EntityId, Scope},
        value::Value,
    };
}
