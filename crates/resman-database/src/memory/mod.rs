//! In-memory entity store for tests and embedded single-process use.

mod store;

pub use store::{MemoryStore, MemoryStoreStats, MemoryTransaction};
