//! In-memory entity store using a Tokio mutex.
//!
//! A transaction holds the store lock for its whole lifetime and works on
//! a staged copy of the state, so transactions are fully serialized.
//! Commit publishes the copy; rollback or drop discards it. The same
//! uniqueness and referential constraints as the SQL schema are enforced.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use resman_core::error::AppError;
use resman_core::result::AppResult;
use resman_core::types::{PoolId, PropertyId, PropertyTypeId, ResourceId, ResourceTypeId, TagId};
use resman_entity::{
    NewPropertyType, NewResourcePool, Property, PropertyType, PropertyValue, Resource,
    ResourcePool, ResourceType, Tag,
};

use crate::store::{EntityStore, ResourceFilter, StoreTransaction};

#[derive(Debug, Clone)]
struct ResourceRow {
    id: ResourceId,
    pool_id: PoolId,
    claimed: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct PropertyRow {
    id: PropertyId,
    resource_id: ResourceId,
    property_type_id: PropertyTypeId,
    value: PropertyValue,
}

/// Internal state; cloned into each transaction.
#[derive(Debug, Clone, Default)]
struct MemoryState {
    next_id: i64,
    resource_types: BTreeMap<ResourceTypeId, ResourceType>,
    property_types: BTreeMap<PropertyTypeId, PropertyType>,
    pools: BTreeMap<PoolId, ResourcePool>,
    resources: BTreeMap<ResourceId, ResourceRow>,
    properties: BTreeMap<PropertyId, PropertyRow>,
    tags: BTreeMap<TagId, Tag>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn tag_of(&self, resource_id: ResourceId) -> Option<&Tag> {
        self.tags.values().find(|t| t.resource_id == resource_id)
    }

    fn property_name(&self, property_type_id: PropertyTypeId) -> String {
        self.property_types
            .get(&property_type_id)
            .map(|pt| pt.name.clone())
            .unwrap_or_default()
    }

    fn to_property(&self, row: &PropertyRow) -> Property {
        Property {
            id: row.id,
            resource_id: row.resource_id,
            property_type_id: row.property_type_id,
            name: self.property_name(row.property_type_id),
            value: row.value.clone(),
        }
    }

    fn load(&self, row: &ResourceRow) -> Resource {
        Resource {
            id: row.id,
            pool_id: row.pool_id,
            claimed: row.claimed,
            tag: self.tag_of(row.id).map(|t| t.tag.clone()),
            created_at: row.created_at,
            properties: self
                .properties
                .values()
                .filter(|p| p.resource_id == row.id)
                .map(|p| self.to_property(p))
                .collect(),
        }
    }

    fn matching(&self, filter: &ResourceFilter) -> Vec<Resource> {
        self.resources
            .values()
            .filter(|row| filter.pool_id.is_none_or(|id| id == row.pool_id))
            .map(|row| self.load(row))
            .filter(|resource| filter.matches(resource))
            .collect()
    }

    fn check_property_type_name(
        &self,
        resource_type_id: ResourceTypeId,
        name: &str,
        except: Option<PropertyTypeId>,
    ) -> AppResult<()> {
        let taken = self.property_types.values().any(|pt| {
            pt.resource_type_id == resource_type_id && pt.name == name && Some(pt.id) != except
        });
        if taken {
            return Err(AppError::conflict(format!(
                "Property type \"{name}\" already exists on resource type {resource_type_id}"
            )));
        }
        Ok(())
    }
}

/// Counts of stored records, for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MemoryStoreStats {
    /// Stored resource types.
    pub resource_types: usize,
    /// Stored property types.
    pub property_types: usize,
    /// Stored pools.
    pub pools: usize,
    /// Stored resources (including blueprints).
    pub resources: usize,
    /// Stored property values.
    pub properties: usize,
    /// Stored claim tags.
    pub tags: usize,
}

/// In-memory entity store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    /// Protected committed state.
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record counts of the committed state.
    ///
    /// Waits for any open transaction to finish.
    pub async fn stats(&self) -> MemoryStoreStats {
        let state = self.state.lock().await;
        MemoryStoreStats {
            resource_types: state.resource_types.len(),
            property_types: state.property_types.len(),
            pools: state.pools.len(),
            resources: state.resources.len(),
            properties: state.properties.len(),
            tags: state.tags.len(),
        }
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTransaction>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, staged }))
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

/// A serialized in-memory transaction.
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn create_resource_type(&mut self, name: &str) -> AppResult<ResourceType> {
        let state = &mut self.staged;
        if state.resource_types.values().any(|rt| rt.name == name) {
            return Err(AppError::conflict(format!(
                "Resource type \"{name}\" already exists"
            )));
        }
        let record = ResourceType {
            id: ResourceTypeId(state.next_id()),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        state.resource_types.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_resource_type(&mut self, id: ResourceTypeId) -> AppResult<Option<ResourceType>> {
        Ok(self.staged.resource_types.get(&id).cloned())
    }

    async fn find_resource_type_by_name(
        &mut self,
        name: &str,
    ) -> AppResult<Option<ResourceType>> {
        Ok(self
            .staged
            .resource_types
            .values()
            .find(|rt| rt.name == name)
            .cloned())
    }

    async fn list_resource_types(&mut self) -> AppResult<Vec<ResourceType>> {
        Ok(self.staged.resource_types.values().cloned().collect())
    }

    async fn rename_resource_type(
        &mut self,
        id: ResourceTypeId,
        name: &str,
    ) -> AppResult<Option<ResourceType>> {
        let state = &mut self.staged;
        if state
            .resource_types
            .values()
            .any(|rt| rt.name == name && rt.id != id)
        {
            return Err(AppError::conflict(format!(
                "Resource type \"{name}\" already exists"
            )));
        }
        Ok(state.resource_types.get_mut(&id).map(|rt| {
            rt.name = name.to_string();
            rt.clone()
        }))
    }

    async fn delete_resource_type(&mut self, id: ResourceTypeId) -> AppResult<bool> {
        let state = &mut self.staged;
        let referenced = state
            .property_types
            .values()
            .any(|pt| pt.resource_type_id == id)
            || state.pools.values().any(|p| p.resource_type_id == id);
        if referenced {
            return Err(AppError::conflict(format!(
                "Resource type {id} is still referenced"
            )));
        }
        Ok(state.resource_types.remove(&id).is_some())
    }

    async fn create_property_type(
        &mut self,
        resource_type_id: ResourceTypeId,
        input: &NewPropertyType,
    ) -> AppResult<PropertyType> {
        let state = &mut self.staged;
        if !state.resource_types.contains_key(&resource_type_id) {
            return Err(AppError::conflict(format!(
                "Resource type {resource_type_id} does not exist"
            )));
        }
        state.check_property_type_name(resource_type_id, &input.name, None)?;
        let record = PropertyType {
            id: PropertyTypeId(state.next_id()),
            resource_type_id,
            name: input.name.clone(),
            value_type: input.value_type.clone(),
            mandatory: input.mandatory,
            default_value: input.default_value.clone(),
        };
        state.property_types.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_property_type(&mut self, id: PropertyTypeId) -> AppResult<Option<PropertyType>> {
        Ok(self.staged.property_types.get(&id).cloned())
    }

    async fn property_types(
        &mut self,
        resource_type_id: ResourceTypeId,
    ) -> AppResult<Vec<PropertyType>> {
        Ok(self
            .staged
            .property_types
            .values()
            .filter(|pt| pt.resource_type_id == resource_type_id)
            .cloned()
            .collect())
    }

    async fn update_property_type(
        &mut self,
        id: PropertyTypeId,
        input: &NewPropertyType,
    ) -> AppResult<Option<PropertyType>> {
        let state = &mut self.staged;
        let Some(resource_type_id) = state.property_types.get(&id).map(|pt| pt.resource_type_id)
        else {
            return Ok(None);
        };
        state.check_property_type_name(resource_type_id, &input.name, Some(id))?;
        Ok(state.property_types.get_mut(&id).map(|pt| {
            pt.name = input.name.clone();
            pt.value_type = input.value_type.clone();
            pt.mandatory = input.mandatory;
            pt.default_value = input.default_value.clone();
            pt.clone()
        }))
    }

    async fn delete_property_type(&mut self, id: PropertyTypeId) -> AppResult<bool> {
        let state = &mut self.staged;
        if state.properties.values().any(|p| p.property_type_id == id) {
            return Err(AppError::conflict(format!(
                "Property type {id} is still referenced by properties"
            )));
        }
        Ok(state.property_types.remove(&id).is_some())
    }

    async fn count_properties_of_type(&mut self, id: PropertyTypeId) -> AppResult<u64> {
        Ok(self
            .staged
            .properties
            .values()
            .filter(|p| p.property_type_id == id)
            .count() as u64)
    }

    async fn create_pool(&mut self, input: &NewResourcePool) -> AppResult<ResourcePool> {
        let state = &mut self.staged;
        if !state.resource_types.contains_key(&input.resource_type_id) {
            return Err(AppError::conflict(format!(
                "Resource type {} does not exist",
                input.resource_type_id
            )));
        }
        if state.pools.values().any(|p| p.name == input.name) {
            return Err(AppError::conflict(format!(
                "Pool \"{}\" already exists",
                input.name
            )));
        }
        let record = ResourcePool {
            id: PoolId(state.next_id()),
            name: input.name.clone(),
            pool_type: input.pool_type.as_str().to_string(),
            resource_type_id: input.resource_type_id,
            created_at: Utc::now(),
        };
        state.pools.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_pool(&mut self, id: PoolId) -> AppResult<Option<ResourcePool>> {
        Ok(self.staged.pools.get(&id).cloned())
    }

    // The transaction already holds the store-wide lock.
    async fn lock_pool(&mut self, id: PoolId) -> AppResult<Option<ResourcePool>> {
        Ok(self.staged.pools.get(&id).cloned())
    }

    async fn find_pool_by_name(&mut self, name: &str) -> AppResult<Option<ResourcePool>> {
        Ok(self
            .staged
            .pools
            .values()
            .find(|p| p.name == name)
            .cloned())
    }

    async fn list_pools(&mut self) -> AppResult<Vec<ResourcePool>> {
        Ok(self.staged.pools.values().cloned().collect())
    }

    async fn count_pools_of_type(&mut self, resource_type_id: ResourceTypeId) -> AppResult<u64> {
        Ok(self
            .staged
            .pools
            .values()
            .filter(|p| p.resource_type_id == resource_type_id)
            .count() as u64)
    }

    async fn delete_pool(&mut self, id: PoolId) -> AppResult<bool> {
        let state = &mut self.staged;
        let referenced = state.resources.values().any(|r| r.pool_id == id)
            || state.tags.values().any(|t| t.pool_id == id);
        if referenced {
            return Err(AppError::conflict(format!(
                "Pool {id} still owns resources"
            )));
        }
        Ok(state.pools.remove(&id).is_some())
    }

    async fn create_resource(
        &mut self,
        pool_id: PoolId,
        claimed: bool,
        tag: Option<&str>,
    ) -> AppResult<Resource> {
        let state = &mut self.staged;
        if !state.pools.contains_key(&pool_id) {
            return Err(AppError::conflict(format!("Pool {pool_id} does not exist")));
        }
        if let Some(tag) = tag {
            if state
                .tags
                .values()
                .any(|t| t.pool_id == pool_id && t.tag == tag)
            {
                return Err(AppError::conflict(format!(
                    "Tag \"{tag}\" already exists in pool {pool_id}"
                )));
            }
        }

        let row = ResourceRow {
            id: ResourceId(state.next_id()),
            pool_id,
            claimed,
            created_at: Utc::now(),
        };
        state.resources.insert(row.id, row.clone());

        if let Some(tag) = tag {
            let record = Tag {
                id: TagId(state.next_id()),
                pool_id,
                resource_id: row.id,
                tag: tag.to_string(),
            };
            state.tags.insert(record.id, record);
        }

        Ok(state.load(&row))
    }

    async fn create_property(
        &mut self,
        resource_id: ResourceId,
        property_type_id: PropertyTypeId,
        value: &PropertyValue,
    ) -> AppResult<Property> {
        let state = &mut self.staged;
        if !state.resources.contains_key(&resource_id) {
            return Err(AppError::conflict(format!(
                "Resource {resource_id} does not exist"
            )));
        }
        if !state.property_types.contains_key(&property_type_id) {
            return Err(AppError::conflict(format!(
                "Property type {property_type_id} does not exist"
            )));
        }
        let row = PropertyRow {
            id: PropertyId(state.next_id()),
            resource_id,
            property_type_id,
            value: value.clone(),
        };
        state.properties.insert(row.id, row.clone());
        Ok(state.to_property(&row))
    }

    async fn find_resources(&mut self, filter: &ResourceFilter) -> AppResult<Vec<Resource>> {
        Ok(self.staged.matching(filter))
    }

    async fn count_resources(&mut self, filter: &ResourceFilter) -> AppResult<u64> {
        Ok(self.staged.matching(filter).len() as u64)
    }

    async fn claim_first_unclaimed(&mut self, pool_id: PoolId) -> AppResult<Option<Resource>> {
        let state = &mut self.staged;
        let Some(row) = state
            .resources
            .values_mut()
            .find(|r| r.pool_id == pool_id && !r.claimed)
        else {
            return Ok(None);
        };
        row.claimed = true;
        let row = row.clone();
        Ok(Some(state.load(&row)))
    }

    async fn compare_and_set_claimed(
        &mut self,
        resource_id: ResourceId,
        expected: bool,
        claimed: bool,
    ) -> AppResult<bool> {
        match self.staged.resources.get_mut(&resource_id) {
            Some(row) if row.claimed == expected => {
                row.claimed = claimed;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_resource(&mut self, resource_id: ResourceId) -> AppResult<bool> {
        let state = &mut self.staged;
        state.properties.retain(|_, p| p.resource_id != resource_id);
        state.tags.retain(|_, t| t.resource_id != resource_id);
        Ok(state.resources.remove(&resource_id).is_some())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        debug!("In-memory transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        debug!("In-memory transaction rolled back");
        Ok(())
    }
}
