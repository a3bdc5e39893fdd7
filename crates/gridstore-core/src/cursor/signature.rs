//! Module: cursor::signature
//! Responsibility: a stable digest of the query shape, so a continuation
//! token can only resume the query it was minted for.

use crate::{
    query::{FilterExpr, SortPredicate},
    serialize::serialize,
    types::Scope,
};
use serde::Serialize;
use sha2::{Digest, Sha256};

///
/// QuerySignature
///
/// SHA-256 over the canonical query shape: scope, target, normalized
/// filter, sort list, direction. Two queries that denote the same result
/// set (And/Or operand order aside) produce the same signature.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct QuerySignature([u8; 32]);

#[derive(Serialize)]
struct SignatureInput<'a> {
    scope: &'a Scope,
    target: &'a str,
    filter: Option<FilterExpr>,
    sorts: &'a [SortPredicate],
    reversed: bool,
}

impl QuerySignature {
    #[must_use]
    pub fn compute(
        scope: &Scope,
        target: &str,
        filter: Option<&FilterExpr>,
        sorts: &[SortPredicate],
        reversed: bool,
    ) -> Self {
        let input = SignatureInput {
            scope,
            target,
            filter: filter.map(|expr| expr.clone().normalize()),
            sorts,
            reversed,
        };

        // shape serialization cannot fail; fall back to hashing nothing
        let bytes = serialize(&input).unwrap_or_default();
        let digest = Sha256::digest(&bytes);

        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Self(out)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}
