//! Shared value types.

pub mod id;

pub use id::{PoolId, PropertyId, PropertyTypeId, ResourceId, ResourceTypeId, TagId};
