//! Resource and claim tag entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use resman_core::types::{PoolId, ResourceId, TagId};

use crate::property::{Property, PropertyValue};

/// Reserved tag designating a singleton pool's blueprint resource.
///
/// Callers can never claim under this tag; freeing it is a no-op.
pub const BLUEPRINT_TAG: &str = "__blueprint__";

/// A resource held by a pool, together with its property values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Resource {
    /// Unique identifier.
    pub id: ResourceId,
    /// Owning pool.
    pub pool_id: PoolId,
    /// Set-pool claim flag.
    pub claimed: bool,
    /// Singleton-pool claim tag (or [`BLUEPRINT_TAG`]).
    pub tag: Option<String>,
    /// When the resource was created.
    pub created_at: DateTime<Utc>,
    /// Property values, loaded with the resource.
    #[sqlx(skip)]
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl Resource {
    /// Whether this is a singleton pool's blueprint.
    pub fn is_blueprint(&self) -> bool {
        self.tag.as_deref() == Some(BLUEPRINT_TAG)
    }

    /// Value of the property with the given name.
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }
}

/// A claim tag associating a caller-chosen identifier with a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Tag {
    /// Unique identifier.
    pub id: TagId,
    /// Pool in which the tag is unique.
    pub pool_id: PoolId,
    /// Tagged resource.
    pub resource_id: ResourceId,
    /// The tag string.
    pub tag: String,
}
