//! The entity store contract consumed by the pool engine.
//!
//! A store hands out transactions; every read and write goes through a
//! [`StoreTransaction`]. Dropping a transaction without committing it
//! must discard its writes.

pub mod filter;

use async_trait::async_trait;

use resman_core::result::AppResult;
use resman_core::types::{PoolId, PropertyTypeId, ResourceId, ResourceTypeId};
use resman_entity::{
    NewPropertyType, NewResourcePool, Property, PropertyType, PropertyValue, Resource,
    ResourcePool, ResourceType,
};

pub use filter::{PropertyPredicate, ResourceFilter};

/// A transactional entity store.
#[async_trait]
pub trait EntityStore: Send + Sync + 'static {
    /// Open a new transaction.
    async fn begin(&self) -> AppResult<Box<dyn StoreTransaction>>;

    /// Check that the store backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}

/// Typed record CRUD and predicate queries scoped to one transaction.
///
/// Constraint violations (duplicate names, duplicate tags, deleting a
/// referenced row) surface as `ErrorKind::Conflict`.
#[async_trait]
pub trait StoreTransaction: Send {
    // ── Resource types ──────────────────────────────────────────

    /// Insert a resource type.
    async fn create_resource_type(&mut self, name: &str) -> AppResult<ResourceType>;

    /// Find a resource type by ID.
    async fn find_resource_type(&mut self, id: ResourceTypeId) -> AppResult<Option<ResourceType>>;

    /// Find a resource type by name.
    async fn find_resource_type_by_name(&mut self, name: &str)
    -> AppResult<Option<ResourceType>>;

    /// List all resource types ordered by ID.
    async fn list_resource_types(&mut self) -> AppResult<Vec<ResourceType>>;

    /// Rename a resource type. Returns `None` if it does not exist.
    async fn rename_resource_type(
        &mut self,
        id: ResourceTypeId,
        name: &str,
    ) -> AppResult<Option<ResourceType>>;

    /// Delete a resource type. Returns `true` if deleted.
    async fn delete_resource_type(&mut self, id: ResourceTypeId) -> AppResult<bool>;

    // ── Property types ──────────────────────────────────────────

    /// Insert a property type on a resource type.
    async fn create_property_type(
        &mut self,
        resource_type_id: ResourceTypeId,
        input: &NewPropertyType,
    ) -> AppResult<PropertyType>;

    /// Find a property type by ID.
    async fn find_property_type(&mut self, id: PropertyTypeId) -> AppResult<Option<PropertyType>>;

    /// All property types declared on a resource type, ordered by ID.
    async fn property_types(
        &mut self,
        resource_type_id: ResourceTypeId,
    ) -> AppResult<Vec<PropertyType>>;

    /// Overwrite a property type's declaration. Returns `None` if it does not exist.
    async fn update_property_type(
        &mut self,
        id: PropertyTypeId,
        input: &NewPropertyType,
    ) -> AppResult<Option<PropertyType>>;

    /// Delete a property type. Returns `true` if deleted.
    async fn delete_property_type(&mut self, id: PropertyTypeId) -> AppResult<bool>;

    /// Number of property values referencing a property type.
    async fn count_properties_of_type(&mut self, id: PropertyTypeId) -> AppResult<u64>;

    // ── Pools ───────────────────────────────────────────────────

    /// Insert a pool row.
    async fn create_pool(&mut self, input: &NewResourcePool) -> AppResult<ResourcePool>;

    /// Find a pool by ID.
    async fn find_pool(&mut self, id: PoolId) -> AppResult<Option<ResourcePool>>;

    /// Find a pool and hold a write lock on its row until the transaction ends.
    ///
    /// Writers that must see each other's changes to the pool (such as
    /// two claims for the same tag) take this lock first.
    async fn lock_pool(&mut self, id: PoolId) -> AppResult<Option<ResourcePool>>;

    /// Find a pool by name.
    async fn find_pool_by_name(&mut self, name: &str) -> AppResult<Option<ResourcePool>>;

    /// List all pools ordered by ID.
    async fn list_pools(&mut self) -> AppResult<Vec<ResourcePool>>;

    /// Number of pools using a resource type.
    async fn count_pools_of_type(&mut self, resource_type_id: ResourceTypeId) -> AppResult<u64>;

    /// Delete a pool row. Fails with `Conflict` while resources remain.
    async fn delete_pool(&mut self, id: PoolId) -> AppResult<bool>;

    // ── Resources ───────────────────────────────────────────────

    /// Insert a resource, tagging it when `tag` is given.
    async fn create_resource(
        &mut self,
        pool_id: PoolId,
        claimed: bool,
        tag: Option<&str>,
    ) -> AppResult<Resource>;

    /// Attach a property value to a resource.
    async fn create_property(
        &mut self,
        resource_id: ResourceId,
        property_type_id: PropertyTypeId,
        value: &PropertyValue,
    ) -> AppResult<Property>;

    /// Resources matching the filter, ordered by ID, with properties loaded.
    async fn find_resources(&mut self, filter: &ResourceFilter) -> AppResult<Vec<Resource>>;

    /// Number of resources matching the filter.
    async fn count_resources(&mut self, filter: &ResourceFilter) -> AppResult<u64>;

    /// Atomically pick one unclaimed resource of the pool and mark it claimed.
    ///
    /// Concurrent callers never receive the same resource. Which resource
    /// is picked is not specified.
    async fn claim_first_unclaimed(&mut self, pool_id: PoolId) -> AppResult<Option<Resource>>;

    /// Set the claim flag if it currently equals `expected`.
    ///
    /// Returns `false` when the resource is missing or its flag differs.
    async fn compare_and_set_claimed(
        &mut self,
        resource_id: ResourceId,
        expected: bool,
        claimed: bool,
    ) -> AppResult<bool>;

    /// Delete a resource together with its properties and tag.
    async fn delete_resource(&mut self, resource_id: ResourceId) -> AppResult<bool>;

    // ── Lifecycle ───────────────────────────────────────────────

    /// Publish all writes.
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// Discard all writes.
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}
