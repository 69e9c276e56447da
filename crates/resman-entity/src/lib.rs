//! # resman-entity
//!
//! Record models for the resource manager. Every struct in this crate
//! represents a stored row or a creation input. Stored records derive
//! `Debug`, `Clone`, `Serialize`, `Deserialize` and read from PostgreSQL
//! through `sqlx::FromRow`.

pub mod pool;
pub mod property;
pub mod property_type;
pub mod resource;
pub mod resource_type;

pub use pool::{NewResourcePool, PoolType, ResourcePool};
pub use property::{Property, PropertyKind, PropertyValue};
pub use property_type::{NewPropertyType, PropertyType};
pub use resource::{BLUEPRINT_TAG, Resource, Tag};
pub use resource_type::{NewResourceType, ResourceType};
