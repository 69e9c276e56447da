//! Set pool: a finite pre-populated inventory claimed like a free-list.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use resman_core::error::AppError;
use resman_core::result::AppResult;
use resman_database::{EntityStore, ResourceFilter, StoreTransaction};
use resman_entity::{PoolType, Resource, ResourcePool};

use crate::context::RequestContext;
use crate::pool::{Pool, ResourceKey};
use crate::properties::{RawResourceProps, compare_props};
use crate::transaction::with_owned_transaction;

/// A pool whose resources are created up front and claimed one at a time.
///
/// A resource is either claimed or free; claims are anonymous and a
/// resource is identified by its property values.
#[derive(Clone)]
pub struct SetPool {
    record: ResourcePool,
    store: Arc<dyn EntityStore>,
}

impl fmt::Debug for SetPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetPool")
            .field("id", &self.record.id)
            .field("name", &self.record.name)
            .finish_non_exhaustive()
    }
}

impl SetPool {
    pub(crate) fn new(record: ResourcePool, store: Arc<dyn EntityStore>) -> Self {
        Self { record, store }
    }

    fn properties_of<'k>(&self, key: &'k ResourceKey) -> AppResult<&'k RawResourceProps> {
        match key {
            ResourceKey::Properties(props) if !props.is_empty() => Ok(props),
            ResourceKey::Properties(_) => Err(AppError::validation(
                "At least one property value is required to identify a resource",
            )),
            ResourceKey::Tag(_) => Err(AppError::validation(format!(
                "Resources of set pool \"{}\" are identified by property values, not tags",
                self.record.name
            ))),
        }
    }

    /// The single resource of this pool matching `props`.
    async fn find_unique(
        &self,
        tx: &mut dyn StoreTransaction,
        props: &RawResourceProps,
        claimed_only: bool,
    ) -> AppResult<Resource> {
        let property_types = tx.property_types(self.record.resource_type_id).await?;
        let predicates = compare_props(&property_types, props)?;

        let mut filter = ResourceFilter::in_pool(self.record.id).with_properties(predicates);
        if claimed_only {
            filter = filter.claimed(true);
        }

        let mut matches = tx.find_resources(&filter).await?;
        if matches.len() != 1 {
            return Err(AppError::ambiguous_or_not_found(format!(
                "Expected exactly one resource matching {}, found {}",
                serde_json::Value::Object(props.clone()),
                matches.len()
            )));
        }
        matches
            .pop()
            .ok_or_else(|| AppError::internal("Resource vanished from result set"))
    }
}

#[async_trait]
impl Pool for SetPool {
    fn record(&self) -> &ResourcePool {
        &self.record
    }

    fn pool_type(&self) -> PoolType {
        PoolType::Set
    }

    async fn claim_resource(&self, ctx: &RequestContext, tag: Option<&str>) -> AppResult<Resource> {
        let tag = tag.map(str::to_string);
        with_owned_transaction(self.store.as_ref(), ctx, self.clone(), move |pool, ctx, tx| {
            Box::pin(async move { pool.claim_resource_in(tx, &ctx, tag.as_deref()).await })
        })
        .await
    }

    async fn free_resource(&self, ctx: &RequestContext, key: &ResourceKey) -> AppResult<()> {
        let key = key.clone();
        with_owned_transaction(self.store.as_ref(), ctx, self.clone(), move |pool, ctx, tx| {
            Box::pin(async move { pool.free_resource_in(tx, &ctx, &key).await })
        })
        .await
    }

    async fn query_resource(&self, ctx: &RequestContext, key: &ResourceKey) -> AppResult<Resource> {
        let key = key.clone();
        with_owned_transaction(self.store.as_ref(), ctx, self.clone(), move |pool, ctx, tx| {
            Box::pin(async move { pool.query_resource_in(tx, &ctx, &key).await })
        })
        .await
    }

    async fn query_resources(&self, ctx: &RequestContext) -> AppResult<Vec<Resource>> {
        with_owned_transaction(self.store.as_ref(), ctx, self.clone(), |pool, ctx, tx| {
            Box::pin(async move { pool.query_resources_in(tx, &ctx).await })
        })
        .await
    }

    async fn destroy(&self, ctx: &RequestContext) -> AppResult<()> {
        with_owned_transaction(self.store.as_ref(), ctx, self.clone(), |pool, ctx, tx| {
            Box::pin(async move { pool.destroy_in(tx, &ctx).await })
        })
        .await
    }

    #[instrument(skip_all, fields(pool = %self.record.name, request_id = %ctx.request_id))]
    async fn claim_resource_in(
        &self,
        tx: &mut dyn StoreTransaction,
        ctx: &RequestContext,
        tag: Option<&str>,
    ) -> AppResult<Resource> {
        if let Some(tag) = tag {
            debug!(tag, "Set pool claims are anonymous; tag not recorded");
        }

        let resource = tx
            .claim_first_unclaimed(self.record.id)
            .await?
            .ok_or_else(|| {
                AppError::pool_exhausted(format!(
                    "No more free resources in pool \"{}\"",
                    self.record.name
                ))
            })?;

        info!(resource_id = %resource.id, "Resource claimed");
        Ok(resource)
    }

    #[instrument(skip_all, fields(pool = %self.record.name, request_id = %ctx.request_id))]
    async fn free_resource_in(
        &self,
        tx: &mut dyn StoreTransaction,
        ctx: &RequestContext,
        key: &ResourceKey,
    ) -> AppResult<()> {
        let context = || format!("Unable to free a resource in pool \"{}\"", self.record.name);
        let props = self.properties_of(key)?;

        let resource = self
            .find_unique(tx, props, false)
            .await
            .map_err(|e| e.context(context()))?;

        if !resource.claimed {
            return Err(AppError::not_claimed(format!(
                "Resource {} is not claimed",
                resource.id
            ))
            .context(context()));
        }

        if !tx.compare_and_set_claimed(resource.id, true, false).await? {
            warn!(resource_id = %resource.id, "Resource was freed concurrently");
            return Err(AppError::not_claimed(format!(
                "Resource {} was freed concurrently",
                resource.id
            ))
            .context(context()));
        }

        info!(resource_id = %resource.id, "Resource freed");
        Ok(())
    }

    #[instrument(skip_all, fields(pool = %self.record.name, request_id = %ctx.request_id))]
    async fn query_resource_in(
        &self,
        tx: &mut dyn StoreTransaction,
        ctx: &RequestContext,
        key: &ResourceKey,
    ) -> AppResult<Resource> {
        let props = self.properties_of(key)?;
        let resource = self.find_unique(tx, props, true).await.map_err(|e| {
            e.context(format!(
                "Unable to query a resource in pool \"{}\"",
                self.record.name
            ))
        })?;
        debug!(resource_id = %resource.id, "Resource found");
        Ok(resource)
    }

    #[instrument(skip_all, fields(pool = %self.record.name, request_id = %ctx.request_id))]
    async fn query_resources_in(
        &self,
        tx: &mut dyn StoreTransaction,
        ctx: &RequestContext,
    ) -> AppResult<Vec<Resource>> {
        let claimed = tx
            .find_resources(&ResourceFilter::in_pool(self.record.id).claimed(true))
            .await?;
        debug!(count = claimed.len(), "Listed claimed resources");
        Ok(claimed)
    }

    #[instrument(skip_all, fields(pool = %self.record.name, request_id = %ctx.request_id))]
    async fn destroy_in(&self, tx: &mut dyn StoreTransaction, ctx: &RequestContext) -> AppResult<()> {
        let in_use = tx
            .count_resources(&ResourceFilter::in_pool(self.record.id).claimed(true))
            .await?;
        if in_use > 0 {
            return Err(AppError::pool_in_use(format!(
                "Unable to destroy pool \"{}\", there are {in_use} claimed resources",
                self.record.name
            )));
        }

        let resources = tx
            .find_resources(&ResourceFilter::in_pool(self.record.id))
            .await?;
        for resource in &resources {
            tx.delete_resource(resource.id).await?;
        }
        tx.delete_pool(self.record.id).await?;

        info!(deleted = resources.len(), "Pool destroyed");
        Ok(())
    }
}
