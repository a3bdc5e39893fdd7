//! Module: types::scope
//! Responsibility: explicit tenant/application partition key.
//! Does not own: authorization; a scope is an isolation key, not a grant.

use derive_more::Deref;
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// Scope
///
/// Partition key under which all entities, index rows, unique values, and
/// membership rows are isolated. Threaded through every store call; never
/// ambient state.
///

#[derive(Clone, Debug, Deref, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Scope(String);

impl Scope {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Scope {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}
