//! Store contract and the in-memory reference implementation.

mod memory;
mod traits;

pub use memory::InMemoryObjectStore;
pub use traits::ObjectStore;
