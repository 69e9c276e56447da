//! Resource pool entity.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use resman_core::types::{PoolId, ResourceTypeId};

/// Allocation discipline of a pool. Never changes after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolType {
    /// One blueprint resource cloned per claiming tag.
    Singleton,
    /// Finite pre-populated inventory claimed like a free-list.
    Set,
}

impl PoolType {
    /// Stored name of the pool type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Singleton => "singleton",
            Self::Set => "set",
        }
    }
}

impl fmt::Display for PoolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoolType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "singleton" => Ok(Self::Singleton),
            "set" => Ok(Self::Set),
            other => Err(format!("unknown pool type \"{other}\"")),
        }
    }
}

/// A named pool of resources of one resource type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ResourcePool {
    /// Unique identifier.
    pub id: PoolId,
    /// Globally unique name.
    pub name: String,
    /// Stored pool type (`"singleton"` or `"set"`).
    pub pool_type: String,
    /// Resource type of every resource in the pool.
    pub resource_type_id: ResourceTypeId,
    /// When the pool was created.
    pub created_at: DateTime<Utc>,
}

impl ResourcePool {
    /// The parsed pool type, or `None` if the stored value is unrecognized.
    pub fn kind(&self) -> Option<PoolType> {
        self.pool_type.parse().ok()
    }
}

/// Input for creating a pool row.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewResourcePool {
    /// Pool name.
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Allocation discipline.
    pub pool_type: PoolType,
    /// Resource type of the pool.
    pub resource_type_id: ResourceTypeId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_pool_type_round_trip() {
        for kind in [PoolType::Singleton, PoolType::Set] {
            assert_eq!(kind.as_str().parse::<PoolType>().unwrap(), kind);
        }
        assert!("ring".parse::<PoolType>().is_err());
    }

    #[test]
    fn test_new_pool_name_validation() {
        let input = NewResourcePool {
            name: String::new(),
            pool_type: PoolType::Set,
            resource_type_id: ResourceTypeId(1),
        };
        assert!(input.validate().is_err());
    }
}
