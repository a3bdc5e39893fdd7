//! Module: index
//! Responsibility: the secondary-index abstraction — ordered row keys, the
//! scan contract, the in-memory column-store stand-in, and the per-type
//! index catalog.
//! Does not own: filter composition or pagination (executor/cursor).

mod catalog;
mod key;
mod memory;
mod store;

#[cfg(test)]
mod tests;

pub use catalog::IndexCatalog;
pub use key::{IndexKey, IndexKind};
pub use memory::MemoryIndexStore;
pub use store::{IndexStore, RangeBound, ScanAnchor, ScanHit, ScanPage};
