//! # resman
//!
//! Typed resource pool manager. Tracks finite resources (VLAN IDs,
//! addresses, device slots) organised in named pools and lets callers
//! claim and free them under their own tags.
//!
//! ```no_run
//! # async fn demo() -> resman::AppResult<()> {
//! use resman::{Pool, RequestContext, ResourceManager};
//!
//! let manager = ResourceManager::in_memory();
//! let ctx = RequestContext::new();
//! let pool = manager.pools().existing_pool(&ctx, "vlans").await?;
//! let resource = pool.claim_resource(&ctx, Some("customer1")).await?;
//! # let _ = resource;
//! # Ok(())
//! # }
//! ```

pub mod logging;
pub mod manager;

pub use logging::init_logging;
pub use manager::{ResourceManager, open_store};

pub use resman_core::config::AppConfig;
pub use resman_core::{AppError, AppResult, ErrorKind};
pub use resman_database::{EntityStore, MemoryStore, PgStore, StoreTransaction};
pub use resman_entity::{
    BLUEPRINT_TAG, NewPropertyType, NewResourceType, PoolType, Property, PropertyKind,
    PropertyType, PropertyValue, Resource, ResourcePool, ResourceType,
};
pub use resman_pools::{
    Pool, PoolFactory, PoolHandle, RawResourceProps, RequestContext, ResourceCatalog, ResourceKey,
    SetPool, SingletonPool, raw_props, with_transaction,
};
