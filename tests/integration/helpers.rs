//! Shared test helpers for integration tests.

use std::sync::Arc;

use resman::{
    AppConfig, MemoryStore, NewPropertyType, NewResourceType, PropertyKind, RawResourceProps,
    RequestContext, ResourceManager, ResourceType, SetPool, SingletonPool, init_logging, raw_props,
};
use resman_database::memory::MemoryStoreStats;

/// Test application context
pub struct TestApp {
    /// The engine under test
    pub manager: ResourceManager,
    /// The in-memory store behind the engine, for direct inspection
    pub store: MemoryStore,
    /// Context used for every call
    pub ctx: RequestContext,
}

impl TestApp {
    /// Create a new test application over an empty in-memory store
    pub fn new() -> Self {
        if std::env::var_os("RESMAN_TEST_LOG").is_some() {
            let config = AppConfig::load("test").expect("Failed to load test config");
            init_logging(&config.logging);
        }

        let store = MemoryStore::new();
        Self {
            manager: ResourceManager::new(Arc::new(store.clone())),
            store,
            ctx: RequestContext::new().with_actor("integration-tests"),
        }
    }

    /// Record counts of the committed store state
    pub async fn stats(&self) -> MemoryStoreStats {
        self.store.stats().await
    }

    /// Create a resource type with one mandatory int property of the same name
    pub async fn int_type(&self, name: &str) -> ResourceType {
        self.manager
            .catalog()
            .create_resource_type(
                &self.ctx,
                NewResourceType::new(name)
                    .with_property(NewPropertyType::mandatory(name, PropertyKind::Int)),
            )
            .await
            .expect("Failed to create resource type")
    }

    /// Create a set pool over `prop` with one resource per value
    pub async fn set_pool(&self, name: &str, prop: &str, values: &[i64]) -> SetPool {
        let rt = self.int_type(prop).await;
        let sets = values.iter().map(|v| int_props(prop, *v)).collect();
        self.manager
            .pools()
            .create_set_pool(&self.ctx, rt.id, name, sets)
            .await
            .expect("Failed to create set pool")
    }

    /// Create a singleton pool over `prop` with the given blueprint value
    pub async fn singleton_pool(&self, name: &str, prop: &str, value: i64) -> SingletonPool {
        let rt = self.int_type(prop).await;
        self.manager
            .pools()
            .create_singleton_pool(&self.ctx, rt.id, name, int_props(prop, value))
            .await
            .expect("Failed to create singleton pool")
    }
}

/// `{name: value}` as raw property input
pub fn int_props(name: &str, value: i64) -> RawResourceProps {
    raw_props([(name, value)])
}
