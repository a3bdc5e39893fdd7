//! Module: cursor
//! Responsibility: opaque continuation tokens — the query-shape signature
//! that pins a token to its query, and the versioned wire encoding.
//! Does not own: where the boundary comes from (executor).

mod signature;
mod token;


pub use signature::QuerySignature;
pub use token::{Boundary, CursorToken, MAX_CURSOR_BYTES};
