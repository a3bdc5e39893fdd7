//! Module: unique
//! Responsibility: cluster-wide unique value reservations (usernames, email
//! addresses) with single-row conditional writes and per-entity history.
//! Does not own: the entity mutation that triggers a reservation.

mod index;
mod memory;
mod store;
mod value;


pub use index::UniqueValueIndex;
pub use memory::MemoryUniqueValueStore;
pub use store::{CasOutcome, UniqueValueStore};
pub use value::UniqueValue;
