//! Module: query
//! Responsibility: the query surface — predicate algebra, the QL parser,
//! and the builder callers hand to the executor.
//! Does not own: planning or evaluation (executor).

mod builder;
pub mod parse;
mod predicate;


pub use builder::{Projection, Query, SortDirection, SortPredicate};
pub use predicate::{CompareOp, ComparePredicate, FilterExpr};

/// Collection names are plural; entity kinds are singular ("users" holds
/// `user` entities). Handles the `-ies` class and plain `-s`.
#[must_use]
pub fn singularize(collection: &str) -> String {
    if let Some(stem) = collection.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{stem}y");
        }
    }

    collection
        .strip_suffix('s')
        .filter(|stem| !stem.is_empty())
        .map_or_else(|| collection.to_string(), str::to_string)
}
