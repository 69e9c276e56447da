//! Singleton pool: one blueprint resource cloned per claiming tag.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use resman_core::error::{AppError, ErrorKind};
use resman_core::result::AppResult;
use resman_database::{EntityStore, ResourceFilter, StoreTransaction};
use resman_entity::{BLUEPRINT_TAG, PoolType, Resource, ResourcePool};

use crate::context::RequestContext;
use crate::pool::{Pool, ResourceKey};
use crate::transaction::with_owned_transaction;

/// A pool that hands every tag its own copy of a single blueprint resource.
///
/// The blueprint lives under [`BLUEPRINT_TAG`] for the whole lifetime of
/// the pool. Claiming a new tag deep-copies the blueprint's properties
/// onto a fresh resource; freeing the tag deletes that copy.
#[derive(Clone)]
pub struct SingletonPool {
    record: ResourcePool,
    store: Arc<dyn EntityStore>,
}

impl fmt::Debug for SingletonPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingletonPool")
            .field("id", &self.record.id)
            .field("name", &self.record.name)
            .finish_non_exhaustive()
    }
}

impl SingletonPool {
    pub(crate) fn new(record: ResourcePool, store: Arc<dyn EntityStore>) -> Self {
        Self { record, store }
    }

    /// The blueprint resource with its properties.
    pub async fn blueprint(&self, ctx: &RequestContext) -> AppResult<Resource> {
        with_owned_transaction(self.store.as_ref(), ctx, self.clone(), |pool, ctx, tx| {
            Box::pin(async move { pool.blueprint_in(tx, &ctx).await })
        })
        .await
    }

    /// [`SingletonPool::blueprint`] inside an outer transaction.
    #[instrument(skip_all, fields(pool = %self.record.name, request_id = %ctx.request_id))]
    pub async fn blueprint_in(
        &self,
        tx: &mut dyn StoreTransaction,
        ctx: &RequestContext,
    ) -> AppResult<Resource> {
        self.find_tagged(tx, BLUEPRINT_TAG).await?.ok_or_else(|| {
            AppError::blueprint_missing(format!(
                "Unable to find blueprint resource in pool \"{}\"",
                self.record.name
            ))
        })
    }

    async fn find_tagged(
        &self,
        tx: &mut dyn StoreTransaction,
        tag: &str,
    ) -> AppResult<Option<Resource>> {
        let mut found = tx
            .find_resources(&ResourceFilter::in_pool(self.record.id).tagged(tag))
            .await?;
        Ok(found.pop())
    }

    fn tag_of<'k>(&self, key: &'k ResourceKey) -> AppResult<&'k str> {
        match key {
            ResourceKey::Tag(tag) => Ok(tag),
            ResourceKey::Properties(_) => Err(AppError::validation(format!(
                "Resources of singleton pool \"{}\" are identified by tag",
                self.record.name
            ))),
        }
    }
}

#[async_trait]
impl Pool for SingletonPool {
    fn record(&self) -> &ResourcePool {
        &self.record
    }

    fn pool_type(&self) -> PoolType {
        PoolType::Singleton
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

    #[instrument(skip_all, fields(pool = %self.record.name, request_id = %ctx.request_id, tag))]
    async fn claim_resource_in(
        &self,
        tx: &mut dyn StoreTransaction,
        ctx: &RequestContext,
        tag: Option<&str>,
    ) -> AppResult<Resource> {
        let tag = match tag {
            Some(tag) if !tag.trim().is_empty() => tag,
            _ => {
                return Err(AppError::validation(format!(
                    "Claiming from singleton pool \"{}\" requires a non-blank tag",
                    self.record.name
                )));
            }
        };
        tracing::Span::current().record("tag", tag);

        if tag == BLUEPRINT_TAG {
            return Err(AppError::validation(format!(
                "Tag \"{BLUEPRINT_TAG}\" is reserved"
            )));
        }

        if let Some(existing) = self.find_tagged(tx, tag).await? {
            debug!(resource_id = %existing.id, "Tag already holds a claim");
            return Ok(existing);
        }

        // New tags are claimed under the pool row lock, so a waiting claim
        // for the same tag finds the winner's copy on the second lookup.
        if tx.lock_pool(self.record.id).await?.is_none() {
            return Err(AppError::not_found(format!(
                "Pool \"{}\" no longer exists",
                self.record.name
            )));
        }
        if let Some(existing) = self.find_tagged(tx, tag).await? {
            debug!(resource_id = %existing.id, "Tag claimed concurrently");
            return Ok(existing);
        }

        let blueprint = self.blueprint_in(tx, ctx).await?;

        let mut resource = tx
            .create_resource(self.record.id, true, Some(tag))
            .await
            .map_err(|e| {
                if e.kind == ErrorKind::Conflict {
                    e.wrap(
                        ErrorKind::AlreadyClaimed,
                        format!("Tag \"{tag}\" was claimed concurrently"),
                    )
                } else {
                    e.context(format!("Unable to claim resource for tag \"{tag}\""))
                }
            })?;

        for property in &blueprint.properties {
            let copy = tx
                .create_property(resource.id, property.property_type_id, &property.value)
                .await
                .map_err(|e| e.context(format!("Unable to copy property \"{}\"", property.name)))?;
            resource.properties.push(copy);
        }

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
        let tag = self.tag_of(key)?;
        if tag == BLUEPRINT_TAG {
            debug!("Freeing the blueprint tag is a no-op");
            return Ok(());
        }

        let resource = self.find_tagged(tx, tag).await?.ok_or_else(|| {
            AppError::not_found(format!(
                "No resource claimed under tag \"{tag}\" in pool \"{}\"",
                self.record.name
            ))
        })?;

        tx.delete_resource(resource.id).await.map_err(|e| {
            e.context(format!("Unable to free resource for tag \"{tag}\""))
        })?;

        info!(resource_id = %resource.id, tag, "Resource freed");
        Ok(())
    }

    #[instrument(skip_all, fields(pool = %self.record.name, request_id = %ctx.request_id))]
    async fn query_resource_in(
        &self,
        tx: &mut dyn StoreTransaction,
        ctx: &RequestContext,
        key: &ResourceKey,
    ) -> AppResult<Resource> {
        let tag = self.tag_of(key)?;
        self.find_tagged(tx, tag).await?.ok_or_else(|| {
            AppError::not_found(format!(
                "No resource claimed under tag \"{tag}\" in pool \"{}\"",
                self.record.name
            ))
        })
    }

    #[instrument(skip_all, fields(pool = %self.record.name, request_id = %ctx.request_id))]
    async fn query_resources_in(
        &self,
        tx: &mut dyn StoreTransaction,
        ctx: &RequestContext,
    ) -> AppResult<Vec<Resource>> {
        let resources = tx
            .find_resources(&ResourceFilter::in_pool(self.record.id))
            .await?;
        debug!(count = resources.len(), "Listed resources including blueprint");
        Ok(resources)
    }

    #[instrument(skip_all, fields(pool = %self.record.name, request_id = %ctx.request_id))]
    async fn destroy_in(&self, tx: &mut dyn StoreTransaction, ctx: &RequestContext) -> AppResult<()> {
        let claims = tx
            .count_resources(&ResourceFilter::in_pool(self.record.id).not_tagged(BLUEPRINT_TAG))
            .await?;
        if claims > 0 {
            return Err(AppError::pool_in_use(format!(
                "Unable to destroy pool \"{}\", there are {claims} claimed resources",
                self.record.name
            )));
        }

        // The blueprint is deleted directly; freeing its tag would be a no-op.
        match self.find_tagged(tx, BLUEPRINT_TAG).await? {
            Some(blueprint) => {
                tx.delete_resource(blueprint.id).await?;
            }
            None => warn!("Blueprint already missing while destroying pool"),
        }
        tx.delete_pool(self.record.id).await?;

        info!("Pool destroyed");
        Ok(())
    }
}
