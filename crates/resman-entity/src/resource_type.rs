//! Resource type entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use resman_core::types::ResourceTypeId;

use crate::property_type::NewPropertyType;

/// A kind of resource (e.g. `vlan`, `ipv4`) that owns a set of property types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ResourceType {
    /// Unique identifier.
    pub id: ResourceTypeId,
    /// Unique, non-empty name.
    pub name: String,
    /// When the type was created.
    pub created_at: DateTime<Utc>,
}

/// Input for creating a resource type together with its property types.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewResourceType {
    /// Resource type name.
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Property types declared on the new resource type.
    #[serde(default)]
    #[validate(nested)]
    pub property_types: Vec<NewPropertyType>,
}

impl NewResourceType {
    /// Create an input with the given name and no property types.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            property_types: Vec::new(),
        }
    }

    /// Declare an additional property type.
    pub fn with_property(mut self, property_type: NewPropertyType) -> Self {
        self.property_types.push(property_type);
        self
    }
}
