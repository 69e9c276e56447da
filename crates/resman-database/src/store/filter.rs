//! Conjunctive equality predicates over resources.

use serde::{Deserialize, Serialize};

use resman_core::types::{PoolId, PropertyTypeId};
use resman_entity::{PropertyValue, Resource};

/// `property.type = T AND property.value = V` for one property of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyPredicate {
    /// Property type to match.
    pub property_type_id: PropertyTypeId,
    /// Value the property must equal.
    pub value: PropertyValue,
}

impl PropertyPredicate {
    /// Create a predicate.
    pub fn new(property_type_id: PropertyTypeId, value: PropertyValue) -> Self {
        Self {
            property_type_id,
            value,
        }
    }

    /// Whether the resource carries a matching property.
    pub fn matches(&self, resource: &Resource) -> bool {
        resource
            .properties
            .iter()
            .any(|p| p.property_type_id == self.property_type_id && p.value == self.value)
    }
}

/// A resource query. Every populated field is ANDed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceFilter {
    /// Restrict to one pool.
    pub pool_id: Option<PoolId>,
    /// Restrict to the given claim flag.
    pub claimed: Option<bool>,
    /// Restrict to resources carrying exactly this tag.
    pub tag: Option<String>,
    /// Exclude resources carrying this tag.
    pub exclude_tag: Option<String>,
    /// Property predicates, all of which must hold.
    pub properties: Vec<PropertyPredicate>,
}

impl ResourceFilter {
    /// All resources of a pool.
    pub fn in_pool(pool_id: PoolId) -> Self {
        Self {
            pool_id: Some(pool_id),
            ..Self::default()
        }
    }

    /// Restrict to the given claim flag.
    pub fn claimed(mut self, claimed: bool) -> Self {
        self.claimed = Some(claimed);
        self
    }

    /// Restrict to one tag.
    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Exclude one tag.
    pub fn not_tagged(mut self, tag: impl Into<String>) -> Self {
        self.exclude_tag = Some(tag.into());
        self
    }

    /// Add property predicates.
    pub fn with_properties(mut self, predicates: Vec<PropertyPredicate>) -> Self {
        self.properties.extend(predicates);
        self
    }

    /// Evaluate the filter against a loaded resource.
    pub fn matches(&self, resource: &Resource) -> bool {
        if self.pool_id.is_some_and(|id| id != resource.pool_id) {
            return false;
        }
        if self.claimed.is_some_and(|c| c != resource.claimed) {
            return false;
        }
        if let Some(tag) = &self.tag {
            if resource.tag.as_deref() != Some(tag.as_str()) {
                return false;
            }
        }
        if let Some(tag) = &self.exclude_tag {
            if resource.tag.as_deref() == Some(tag.as_str()) {
                return false;
            }
        }
        self.properties.iter().all(|p| p.matches(resource))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use resman_core::types::{PropertyId, ResourceId};
    use resman_entity::Property;

    use super::*;

    fn resource(claimed: bool, tag: Option<&str>, vlan: i64) -> Resource {
        Resource {
            id: ResourceId(1),
            pool_id: PoolId(1),
            claimed,
            tag: tag.map(str::to_string),
            created_at: Utc::now(),
            properties: vec![Property {
                id: PropertyId(1),
                resource_id: ResourceId(1),
                property_type_id: PropertyTypeId(3),
                name: "vlan".to_string(),
                value: PropertyValue::Int(vlan),
            }],
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(ResourceFilter::default().matches(&resource(false, None, 1)));
    }

    #[test]
    fn test_pool_and_claim_flag() {
        let filter = ResourceFilter::in_pool(PoolId(1)).claimed(true);
        assert!(filter.matches(&resource(true, None, 1)));
        assert!(!filter.matches(&resource(false, None, 1)));
        assert!(!ResourceFilter::in_pool(PoolId(2)).matches(&resource(true, None, 1)));
    }

    #[test]
    fn test_tag_and_exclusion() {
        let res = resource(true, Some("customer1"), 1);
        assert!(ResourceFilter::default().tagged("customer1").matches(&res));
        assert!(!ResourceFilter::default().tagged("customer2").matches(&res));
        assert!(!ResourceFilter::default().not_tagged("customer1").matches(&res));
        assert!(ResourceFilter::default().not_tagged("x").matches(&resource(true, None, 1)));
    }

    #[test]
    fn test_property_predicates_are_conjunctive() {
        let res = resource(true, None, 44);
        let hit = PropertyPredicate::new(PropertyTypeId(3), PropertyValue::Int(44));
        let miss = PropertyPredicate::new(PropertyTypeId(3), PropertyValue::Int(45));
        assert!(ResourceFilter::default().with_properties(vec![hit.clone()]).matches(&res));
        assert!(!ResourceFilter::default()
            .with_properties(vec![hit, miss])
            .matches(&res));
    }
}
