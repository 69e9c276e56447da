//! Pool contract and its two allocation strategies.

pub mod factory;
pub mod set;
pub mod singleton;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use resman_core::result::AppResult;
use resman_database::StoreTransaction;
use resman_entity::{PoolType, Resource, ResourcePool};

use crate::context::RequestContext;
use crate::properties::RawResourceProps;

pub use factory::PoolFactory;
pub use set::SetPool;
pub use singleton::SingletonPool;

/// How a caller designates one resource of a pool.
///
/// Set pools identify resources by property values; singleton pools by
/// claim tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKey {
    /// The tag a singleton resource was claimed under.
    Tag(String),
    /// Property values matching exactly one set-pool resource.
    Properties(RawResourceProps),
}

impl ResourceKey {
    /// Key by claim tag.
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Tag(tag.into())
    }

    /// Key by property values.
    pub fn properties(props: RawResourceProps) -> Self {
        Self::Properties(props)
    }
}

/// Claim, free, query and destroy operations common to every pool.
///
/// The plain methods each run in their own transaction. The `_in`
/// variants join a transaction owned by the caller and leave commit and
/// rollback to it.
#[async_trait]
pub trait Pool: Send + Sync + std::fmt::Debug {
    /// The stored pool record.
    fn record(&self) -> &ResourcePool;

    /// The pool's allocation discipline.
    fn pool_type(&self) -> PoolType;

    /// Claims a resource, optionally under a tag.
    async fn claim_resource(&self, ctx: &RequestContext, tag: Option<&str>) -> AppResult<Resource>;

    /// Releases a claimed resource.
    async fn free_resource(&self, ctx: &RequestContext, key: &ResourceKey) -> AppResult<()>;

    /// Looks up one claimed resource.
    async fn query_resource(&self, ctx: &RequestContext, key: &ResourceKey) -> AppResult<Resource>;

    /// Lists the pool's resources.
    async fn query_resources(&self, ctx: &RequestContext) -> AppResult<Vec<Resource>>;

    /// Deletes the pool and its resources. Fails while claims are live.
    async fn destroy(&self, ctx: &RequestContext) -> AppResult<()>;

    /// [`Pool::claim_resource`] inside an outer transaction.
    async fn claim_resource_in(
        &self,
        tx: &mut dyn StoreTransaction,
        ctx: &RequestContext,
        tag: Option<&str>,
    ) -> AppResult<Resource>;

    /// [`Pool::free_resource`] inside an outer transaction.
    async fn free_resource_in(
        &self,
        tx: &mut dyn StoreTransaction,
        ctx: &RequestContext,
        key: &ResourceKey,
    ) -> AppResult<()>;

    /// [`Pool::query_resource`] inside an outer transaction.
    async fn query_resource_in(
        &self,
        tx: &mut dyn StoreTransaction,
        ctx: &RequestContext,
        key: &ResourceKey,
    ) -> AppResult<Resource>;

    /// [`Pool::query_resources`] inside an outer transaction.
    async fn query_resources_in(
        &self,
        tx: &mut dyn StoreTransaction,
        ctx: &RequestContext,
    ) -> AppResult<Vec<Resource>>;

    /// [`Pool::destroy`] inside an outer transaction.
    async fn destroy_in(&self, tx: &mut dyn StoreTransaction, ctx: &RequestContext) -> AppResult<()>;
}

/// A resolved pool of either kind.
#[derive(Debug, Clone)]
pub enum PoolHandle {
    /// A set pool.
    Set(SetPool),
    /// A singleton pool.
    Singleton(SingletonPool),
}

impl PoolHandle {
    /// The set pool, if this is one.
    pub fn as_set(&self) -> Option<&SetPool> {
        match self {
            Self::Set(pool) => Some(pool),
            Self::Singleton(_) => None,
        }
    }

    /// The singleton pool, if this is one.
    pub fn as_singleton(&self) -> Option<&SingletonPool> {
        match self {
            Self::Singleton(pool) => Some(pool),
            Self::Set(_) => None,
        }
    }

    fn inner(&self) -> &dyn Pool {
        match self {
            Self::Set(pool) => pool,
            Self::Singleton(pool) => pool,
        }
    }
}

impl From<SetPool> for PoolHandle {
    fn from(pool: SetPool) -> Self {
        Self::Set(pool)
    }
}

impl From<SingletonPool> for PoolHandle {
    fn from(pool: SingletonPool) -> Self {
        Self::Singleton(pool)
    }
}

#[async_trait]
impl Pool for PoolHandle {
    fn record(&self) -> &ResourcePool {
        self.inner().record()
    }

    fn pool_type(&self) -> PoolType {
        self.inner().pool_type()
    }

    async fn claim_resource(&self, ctx: &RequestContext, tag: Option<&str>) -> AppResult<Resource> {
        self.inner().claim_resource(ctx, tag).await
    }

    async fn free_resource(&self, ctx: &RequestContext, key: &ResourceKey) -> AppResult<()> {
        self.inner().free_resource(ctx, key).await
    }

    async fn query_resource(&self, ctx: &RequestContext, key: &ResourceKey) -> AppResult<Resource> {
        self.inner().query_resource(ctx, key).await
    }

    async fn query_resources(&self, ctx: &RequestContext) -> AppResult<Vec<Resource>> {
        self.inner().query_resources(ctx).await
    }

    async fn destroy(&self, ctx: &RequestContext) -> AppResult<()> {
        self.inner().destroy(ctx).await
    }

    async fn claim_resource_in(
        &self,
        tx: &mut dyn StoreTransaction,
        ctx: &RequestContext,
        tag: Option<&str>,
    ) -> AppResult<Resource> {
        self.inner().claim_resource_in(tx, ctx, tag).await
    }

    async fn free_resource_in(
        &self,
        tx: &mut dyn StoreTransaction,
        ctx: &RequestContext,
        key: &ResourceKey,
    ) -> AppResult<()> {
        self.inner().free_resource_in(tx, ctx, key).await
    }

    async fn query_resource_in(
        &self,
        tx: &mut dyn StoreTransaction,
        ctx: &RequestContext,
        key: &ResourceKey,
    ) -> AppResult<Resource> {
        self.inner().query_resource_in(tx, ctx, key).await
    }

    async fn query_resources_in(
        &self,
        tx: &mut dyn StoreTransaction,
        ctx: &RequestContext,
    ) -> AppResult<Vec<Resource>> {
        self.inner().query_resources_in(tx, ctx).await
    }

    async fn destroy_in(&self, tx: &mut dyn StoreTransaction, ctx: &RequestContext) -> AppResult<()> {
        self.inner().destroy_in(tx, ctx).await
    }
}
