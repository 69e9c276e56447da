//! PostgreSQL entity store.
//!
//! Each [`PgTransaction`] owns a `sqlx::Transaction`; dropping it without
//! committing rolls the work back.

mod connect;
pub(crate) mod error;
pub mod repositories;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use tracing::debug;

use resman_core::error::{AppError, ErrorKind};
use resman_core::result::AppResult;
use resman_core::types::{PoolId, PropertyTypeId, ResourceId, ResourceTypeId};
use resman_entity::{
    NewPropertyType, NewResourcePool, Property, PropertyType, PropertyValue, Resource,
    ResourcePool, ResourceType,
};

use crate::store::{EntityStore, ResourceFilter, StoreTransaction};

use self::repositories::{pool, property_type, resource, resource_type};

/// Entity store backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing sqlx pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntityStore for PgStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::TransactionFailure,
                format!("Failed to begin transaction: {e}"),
                e,
            )
        })?;
        debug!("PostgreSQL transaction opened");
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Health check failed", e))
    }
}

/// A PostgreSQL transaction.
pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn create_resource_type(&mut self, name: &str) -> AppResult<ResourceType> {
        resource_type::create(&mut self.tx, name).await
    }

    async fn find_resource_type(&mut self, id: ResourceTypeId) -> AppResult<Option<ResourceType>> {
        resource_type::find_by_id(&mut self.tx, id).await
    }

    async fn find_resource_type_by_name(
        &mut self,
        name: &str,
    ) -> AppResult<Option<ResourceType>> {
        resource_type::find_by_name(&mut self.tx, name).await
    }

    async fn list_resource_types(&mut self) -> AppResult<Vec<ResourceType>> {
        resource_type::find_all(&mut self.tx).await
    }

    async fn rename_resource_type(
        &mut self,
        id: ResourceTypeId,
        name: &str,
    ) -> AppResult<Option<ResourceType>> {
        resource_type::rename(&mut self.tx, id, name).await
    }

    async fn delete_resource_type(&mut self, id: ResourceTypeId) -> AppResult<bool> {
        resource_type::delete(&mut self.tx, id).await
    }

    async fn create_property_type(
        &mut self,
        resource_type_id: ResourceTypeId,
        input: &NewPropertyType,
    ) -> AppResult<PropertyType> {
        property_type::create(&mut self.tx, resource_type_id, input).await
    }

    async fn find_property_type(&mut self, id: PropertyTypeId) -> AppResult<Option<PropertyType>> {
        property_type::find_by_id(&mut self.tx, id).await
    }

    async fn property_types(
        &mut self,
        resource_type_id: ResourceTypeId,
    ) -> AppResult<Vec<PropertyType>> {
        property_type::find_by_resource_type(&mut self.tx, resource_type_id).await
    }

    async fn update_property_type(
        &mut self,
        id: PropertyTypeId,
        input: &NewPropertyType,
    ) -> AppResult<Option<PropertyType>> {
        property_type::update(&mut self.tx, id, input).await
    }

    async fn delete_property_type(&mut self, id: PropertyTypeId) -> AppResult<bool> {
        property_type::delete(&mut self.tx, id).await
    }

    async fn count_properties_of_type(&mut self, id: PropertyTypeId) -> AppResult<u64> {
        property_type::count_properties(&mut self.tx, id).await
    }

    async fn create_pool(&mut self, input: &NewResourcePool) -> AppResult<ResourcePool> {
        pool::create(&mut self.tx, input).await
    }

    async fn find_pool(&mut self, id: PoolId) -> AppResult<Option<ResourcePool>> {
        pool::find_by_id(&mut self.tx, id).await
    }

    async fn lock_pool(&mut self, id: PoolId) -> AppResult<Option<ResourcePool>> {
        pool::lock_by_id(&mut self.tx, id).await
    }

    async fn find_pool_by_name(&mut self, name: &str) -> AppResult<Option<ResourcePool>> {
        pool::find_by_name(&mut self.tx, name).await
    }

    async fn list_pools(&mut self) -> AppResult<Vec<ResourcePool>> {
        pool::find_all(&mut self.tx).await
    }

    async fn count_pools_of_type(&mut self, resource_type_id: ResourceTypeId) -> AppResult<u64> {
        pool::count_by_resource_type(&mut self.tx, resource_type_id).await
    }

    async fn delete_pool(&mut self, id: PoolId) -> AppResult<bool> {
        pool::delete(&mut self.tx, id).await
    }

    async fn create_resource(
        &mut self,
        pool_id: PoolId,
        claimed: bool,
        tag: Option<&str>,
    ) -> AppResult<Resource> {
        resource::create(&mut self.tx, pool_id, claimed, tag).await
    }

    async fn create_property(
        &mut self,
        resource_id: ResourceId,
        property_type_id: PropertyTypeId,
        value: &PropertyValue,
    ) -> AppResult<Property> {
        resource::create_property(&mut self.tx, resource_id, property_type_id, value).await
    }

    async fn find_resources(&mut self, filter: &ResourceFilter) -> AppResult<Vec<Resource>> {
        resource::find(&mut self.tx, filter).await
    }

    async fn count_resources(&mut self, filter: &ResourceFilter) -> AppResult<u64> {
        resource::count(&mut self.tx, filter).await
    }

    async fn claim_first_unclaimed(&mut self, pool_id: PoolId) -> AppResult<Option<Resource>> {
        resource::claim_first_unclaimed(&mut self.tx, pool_id).await
    }

    async fn compare_and_set_claimed(
        &mut self,
        resource_id: ResourceId,
        expected: bool,
        claimed: bool,
    ) -> AppResult<bool> {
        resource::compare_and_set_claimed(&mut self.tx, resource_id, expected, claimed).await
    }

    async fn delete_resource(&mut self, resource_id: ResourceId) -> AppResult<bool> {
        resource::delete(&mut self.tx, resource_id).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let this = *self;
        this.tx.commit().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::TransactionFailure,
                format!("Failed to commit transaction: {e}"),
                e,
            )
        })
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        let this = *self;
        this.tx.rollback().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::TransactionFailure,
                format!("Failed to roll back transaction: {e}"),
                e,
            )
        })
    }
}
