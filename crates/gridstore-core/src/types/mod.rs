mod id;
mod scope;

pub use id::{EntityId, IdGenerator};
pub use scope::Scope;
