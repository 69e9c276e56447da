//! Transaction-scoped queries, one module per record type.

pub mod pool;
pub mod property_type;
pub mod resource;
pub mod resource_type;
