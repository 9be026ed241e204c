pub mod embedding;
pub mod engine;
pub mod importance;
pub mod store;

pub use engine::{MemoryContext, MemoryEngine};
pub use store::MemoryStore;
