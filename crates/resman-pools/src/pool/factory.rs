//! Pool creation and lookup.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, instrument};
use validator::Validate;

use resman_core::error::{AppError, ErrorKind};
use resman_core::result::AppResult;
use resman_core::types::{PoolId, PropertyTypeId, ResourceTypeId};
use resman_database::{EntityStore, StoreTransaction};
use resman_entity::{BLUEPRINT_TAG, NewResourcePool, PoolType, PropertyValue, ResourcePool};

use crate::context::RequestContext;
use crate::pool::{Pool, PoolHandle, SetPool, SingletonPool};
use crate::properties::{ParsedProperty, RawResourceProps, parse_props, persist_props};
use crate::transaction::with_owned_transaction;

/// Creates new pools and resolves existing ones.
#[derive(Clone)]
pub struct PoolFactory {
    store: Arc<dyn EntityStore>,
}

impl std::fmt::Debug for PoolFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolFactory").finish_non_exhaustive()
    }
}

impl PoolFactory {
    /// Creates a factory over an entity store.
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Creates a set pool holding one unclaimed resource per property-value set.
    pub async fn create_set_pool(
        &self,
        ctx: &RequestContext,
        resource_type_id: ResourceTypeId,
        name: &str,
        value_sets: Vec<RawResourceProps>,
    ) -> AppResult<SetPool> {
        let name = name.to_string();
        with_owned_transaction(self.store.as_ref(), ctx, self.clone(), move |factory, ctx, tx| {
            Box::pin(async move {
                factory
                    .create_set_pool_in(tx, &ctx, resource_type_id, &name, &value_sets)
                    .await
            })
        })
        .await
    }

    /// [`PoolFactory::create_set_pool`] inside an outer transaction.
    #[instrument(skip_all, fields(pool = %name, request_id = %ctx.request_id))]
    pub async fn create_set_pool_in(
        &self,
        tx: &mut dyn StoreTransaction,
        ctx: &RequestContext,
        resource_type_id: ResourceTypeId,
        name: &str,
        value_sets: &[RawResourceProps],
    ) -> AppResult<SetPool> {
        self.build_set_pool(tx, resource_type_id, name, value_sets)
            .await
            .map_err(|e| creation_error(e, name))
    }

    /// Creates a singleton pool whose blueprint carries `values`.
    pub async fn create_singleton_pool(
        &self,
        ctx: &RequestContext,
        resource_type_id: ResourceTypeId,
        name: &str,
        values: RawResourceProps,
    ) -> AppResult<SingletonPool> {
        let name = name.to_string();
        with_owned_transaction(self.store.as_ref(), ctx, self.clone(), move |factory, ctx, tx| {
            Box::pin(async move {
                factory
                    .create_singleton_pool_in(tx, &ctx, resource_type_id, &name, &values)
                    .await
            })
        })
        .await
    }

    /// [`PoolFactory::create_singleton_pool`] inside an outer transaction.
    #[instrument(skip_all, fields(pool = %name, request_id = %ctx.request_id))]
    pub async fn create_singleton_pool_in(
        &self,
        tx: &mut dyn StoreTransaction,
        ctx: &RequestContext,
        resource_type_id: ResourceTypeId,
        name: &str,
        values: &RawResourceProps,
    ) -> AppResult<SingletonPool> {
        self.build_singleton_pool(tx, resource_type_id, name, values)
            .await
            .map_err(|e| creation_error(e, name))
    }

    /// Resolves a pool by name.
    pub async fn existing_pool(&self, ctx: &RequestContext, name: &str) -> AppResult<PoolHandle> {
        let name = name.to_string();
        with_owned_transaction(self.store.as_ref(), ctx, self.clone(), move |factory, _ctx, tx| {
            Box::pin(async move { factory.existing_pool_in(tx, &name).await })
        })
        .await
    }

    /// [`PoolFactory::existing_pool`] inside an outer transaction.
    pub async fn existing_pool_in(
        &self,
        tx: &mut dyn StoreTransaction,
        name: &str,
    ) -> AppResult<PoolHandle> {
        let record = tx
            .find_pool_by_name(name)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Pool \"{name}\" not found")))?;
        self.handle(record)
    }

    /// Resolves a pool by ID.
    pub async fn existing_pool_from_id(
        &self,
        ctx: &RequestContext,
        id: PoolId,
    ) -> AppResult<PoolHandle> {
        with_owned_transaction(self.store.as_ref(), ctx, self.clone(), move |factory, _ctx, tx| {
            Box::pin(async move { factory.existing_pool_from_id_in(tx, id).await })
        })
        .await
    }

    /// [`PoolFactory::existing_pool_from_id`] inside an outer transaction.
    pub async fn existing_pool_from_id_in(
        &self,
        tx: &mut dyn StoreTransaction,
        id: PoolId,
    ) -> AppResult<PoolHandle> {
        let record = tx
            .find_pool(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Pool {id} not found")))?;
        self.handle(record)
    }

    /// Lists every pool record.
    pub async fn list_pools(&self, ctx: &RequestContext) -> AppResult<Vec<ResourcePool>> {
        with_owned_transaction(self.store.as_ref(), ctx, (), |_, _ctx, tx| {
            Box::pin(async move { tx.list_pools().await })
        })
        .await
    }

    /// Destroys the pool with the given ID.
    ///
    /// Fails with `PoolInUse` while the pool holds live claims.
    pub async fn delete_pool(&self, ctx: &RequestContext, id: PoolId) -> AppResult<()> {
        with_owned_transaction(self.store.as_ref(), ctx, self.clone(), move |factory, ctx, tx| {
            Box::pin(async move {
                let pool = factory.existing_pool_from_id_in(tx, id).await?;
                pool.destroy_in(tx, &ctx).await
            })
        })
        .await
    }

    async fn build_set_pool(
        &self,
        tx: &mut dyn StoreTransaction,
        resource_type_id: ResourceTypeId,
        name: &str,
        value_sets: &[RawResourceProps],
    ) -> AppResult<SetPool> {
        let record = create_record(tx, resource_type_id, name, PoolType::Set).await?;
        let property_types = tx.property_types(resource_type_id).await?;

        let mut seen: HashSet<Vec<(PropertyTypeId, PropertyValue)>> = HashSet::new();
        let mut parsed_sets = Vec::with_capacity(value_sets.len());
        for raw in value_sets {
            let parsed = parse_props(&property_types, raw)
                .map_err(|e| e.context("Error parsing properties"))?;
            if !seen.insert(identity(&parsed)) {
                return Err(AppError::pool_creation(format!(
                    "Duplicate resource {}",
                    serde_json::Value::Object(raw.clone())
                )));
            }
            parsed_sets.push(parsed);
        }

        for parsed in &parsed_sets {
            let resource = tx.create_resource(record.id, false, None).await?;
            persist_props(tx, resource.id, parsed).await?;
        }

        info!(resources = parsed_sets.len(), "Set pool created");
        Ok(SetPool::new(record, Arc::clone(&self.store)))
    }

    async fn build_singleton_pool(
        &self,
        tx: &mut dyn StoreTransaction,
        resource_type_id: ResourceTypeId,
        name: &str,
        values: &RawResourceProps,
    ) -> AppResult<SingletonPool> {
        let record = create_record(tx, resource_type_id, name, PoolType::Singleton).await?;
        let property_types = tx.property_types(resource_type_id).await?;
        let parsed = parse_props(&property_types, values)
            .map_err(|e| e.context("Error parsing properties"))?;

        let blueprint = tx
            .create_resource(record.id, false, Some(BLUEPRINT_TAG))
            .await?;
        persist_props(tx, blueprint.id, &parsed).await?;

        info!(blueprint_id = %blueprint.id, "Singleton pool created");
        Ok(SingletonPool::new(record, Arc::clone(&self.store)))
    }

    /// Wraps a stored pool record in the handle matching its type.
    fn handle(&self, record: ResourcePool) -> AppResult<PoolHandle> {
        debug!(pool = %record.name, pool_type = %record.pool_type, "Resolved pool");
        match record.kind() {
            Some(PoolType::Set) => Ok(SetPool::new(record, Arc::clone(&self.store)).into()),
            Some(PoolType::Singleton) => {
                Ok(SingletonPool::new(record, Arc::clone(&self.store)).into())
            }
            None => Err(AppError::unknown_pool_type(format!(
                "Unknown pool type \"{}\" for pool \"{}\"",
                record.pool_type, record.name
            ))),
        }
    }
}

async fn create_record(
    tx: &mut dyn StoreTransaction,
    resource_type_id: ResourceTypeId,
    name: &str,
    pool_type: PoolType,
) -> AppResult<ResourcePool> {
    let input = NewResourcePool {
        name: name.to_string(),
        pool_type,
        resource_type_id,
    };
    input.validate()?;

    if tx.find_resource_type(resource_type_id).await?.is_none() {
        return Err(AppError::not_found(format!(
            "Resource type {resource_type_id} not found"
        )));
    }
    if tx.find_pool_by_name(name).await?.is_some() {
        return Err(AppError::conflict(format!("Pool \"{name}\" already exists")));
    }

    tx.create_pool(&input).await
}

/// Order-independent identity of a parsed property set.
fn identity(parsed: &[ParsedProperty]) -> Vec<(PropertyTypeId, PropertyValue)> {
    let mut key: Vec<_> = parsed
        .iter()
        .map(|p| (p.property_type_id, p.value.clone()))
        .collect();
    key.sort_by_key(|(id, _)| *id);
    key
}

fn creation_error(err: AppError, name: &str) -> AppError {
    if err.kind == ErrorKind::PoolCreation {
        return err;
    }
    err.wrap(
        ErrorKind::PoolCreation,
        format!("Unable to create new pool \"{name}\""),
    )
}
