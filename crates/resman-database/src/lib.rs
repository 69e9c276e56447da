//! # resman-database
//!
//! The entity store contract consumed by the pool engine, with a
//! PostgreSQL implementation (sqlx) and an in-memory implementation.

pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{EntityStore, PropertyPredicate, ResourceFilter, StoreTransaction};
