//! Store selection and engine wiring.

use std::sync::Arc;

use tracing::info;

use resman_core::config::{AppConfig, StoreBackend};
use resman_core::result::AppResult;
use resman_database::{EntityStore, MemoryStore, PgStore};
use resman_pools::{PoolFactory, ResourceCatalog};

/// Open the entity store selected by configuration.
///
/// The PostgreSQL backend connects, then applies the schema when
/// `store.run_migrations` is set.
pub async fn open_store(config: &AppConfig) -> AppResult<Arc<dyn EntityStore>> {
    match config.store.backend {
        StoreBackend::Memory => {
            info!("Using in-memory entity store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let store = PgStore::connect(&config.database).await?;
            if config.store.run_migrations {
                store.apply_schema().await?;
            }
            Ok(Arc::new(store))
        }
    }
}

/// The pool factory and resource catalog sharing one entity store.
#[derive(Clone)]
pub struct ResourceManager {
    store: Arc<dyn EntityStore>,
    pools: PoolFactory,
    catalog: ResourceCatalog,
}

impl std::fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceManager").finish_non_exhaustive()
    }
}

impl ResourceManager {
    /// Wire the engine over an entity store.
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            pools: PoolFactory::new(Arc::clone(&store)),
            catalog: ResourceCatalog::new(Arc::clone(&store)),
            store,
        }
    }

    /// An engine over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Open the configured store and wire the engine over it.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        let store = open_store(config).await?;
        Ok(Self::new(store))
    }

    /// Pool creation and lookup.
    pub fn pools(&self) -> &PoolFactory {
        &self.pools
    }

    /// Resource-type administration.
    pub fn catalog(&self) -> &ResourceCatalog {
        &self.catalog
    }

    /// The shared entity store, for composing operations in one transaction.
    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    /// Check that the store backend is reachable.
    pub async fn health_check(&self) -> AppResult<bool> {
        self.store.health_check().await
    }
}
