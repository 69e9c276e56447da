//! PostgreSQL-backed integration tests.
//!
//! Skipped unless `RESMAN_TEST_DATABASE_URL` points at a scratch database.

use std::collections::HashSet;
use std::sync::Arc;

use resman::{
    ErrorKind, NewPropertyType, NewResourceType, PgStore, Pool, PropertyKind, PropertyValue,
    RequestContext, ResourceKey, ResourceManager, raw_props,
};
use resman_core::config::DatabaseConfig;
use uuid::Uuid;

async fn pg_manager() -> Option<ResourceManager> {
    let url = std::env::var("RESMAN_TEST_DATABASE_URL").ok()?;
    let config = DatabaseConfig {
        url,
        ..DatabaseConfig::default()
    };

    let store = PgStore::connect(&config)
        .await
        .expect("Failed to connect to test database");
    store
        .apply_schema()
        .await
        .expect("Failed to apply schema");

    Some(ResourceManager::new(Arc::new(store)))
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

#[tokio::test]
async fn test_pg_singleton_scenario() {
    let Some(manager) = pg_manager().await else {
        return;
    };
    let ctx = RequestContext::new();
    assert!(manager.health_check().await.unwrap());

    let rt = manager
        .catalog()
        .create_resource_type(
            &ctx,
            NewResourceType::new(unique("vlan"))
                .with_property(NewPropertyType::mandatory("vlan", PropertyKind::Int)),
        )
        .await
        .unwrap();
    let pool = manager
        .pools()
        .create_singleton_pool(&ctx, rt.id, &unique("singleton"), raw_props([("vlan", 44)]))
        .await
        .unwrap();

    let first = pool.claim_resource(&ctx, Some("customer1")).await.unwrap();
    assert_eq!(first.property("vlan"), Some(&PropertyValue::Int(44)));
    assert_eq!(
        pool.claim_resource(&ctx, Some("customer1")).await.unwrap().id,
        first.id
    );

    let err = pool.destroy(&ctx).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::PoolInUse);

    pool.free_resource(&ctx, &ResourceKey::tag("customer1"))
        .await
        .unwrap();
    let second = pool.claim_resource(&ctx, Some("customer1")).await.unwrap();
    assert_ne!(second.id, first.id);

    pool.free_resource(&ctx, &ResourceKey::tag("customer1"))
        .await
        .unwrap();
    pool.destroy(&ctx).await.unwrap();
    manager.catalog().delete_resource_type(&ctx, rt.id).await.unwrap();
}

#[tokio::test]
async fn test_pg_concurrent_set_claims() {
    let Some(manager) = pg_manager().await else {
        return;
    };
    let ctx = RequestContext::new();

    let rt = manager
        .catalog()
        .create_resource_type(
            &ctx,
            NewResourceType::new(unique("slot"))
                .with_property(NewPropertyType::mandatory("slot", PropertyKind::Int)),
        )
        .await
        .unwrap();
    let sets = (0..10).map(|i| raw_props([("slot", i)])).collect();
    let pool = manager
        .pools()
        .create_set_pool(&ctx, rt.id, &unique("slots"), sets)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let pool = pool.clone();
        let ctx = ctx.clone();
        handles.push(tokio::spawn(async move { pool.claim_resource(&ctx, None).await }));
    }

    let mut claimed = HashSet::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(resource) => assert!(claimed.insert(resource.id)),
            Err(e) => assert_eq!(e.kind, ErrorKind::PoolExhausted),
        }
    }
    assert_eq!(claimed.len(), 10);

    for slot in 0..10 {
        pool.free_resource(&ctx, &ResourceKey::properties(raw_props([("slot", slot)])))
            .await
            .unwrap();
    }
    pool.destroy(&ctx).await.unwrap();
}

#[tokio::test]
async fn test_pg_concurrent_claims_for_one_tag_converge() {
    let Some(manager) = pg_manager().await else {
        return;
    };
    let ctx = RequestContext::new();

    let rt = manager
        .catalog()
        .create_resource_type(
            &ctx,
            NewResourceType::new(unique("vlan"))
                .with_property(NewPropertyType::mandatory("vlan", PropertyKind::Int)),
        )
        .await
        .unwrap();
    let pool = manager
        .pools()
        .create_singleton_pool(&ctx, rt.id, &unique("singleton"), raw_props([("vlan", 7)]))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let pool = pool.clone();
        let ctx = ctx.clone();
        handles.push(tokio::spawn(async move {
            pool.claim_resource(&ctx, Some("customer1")).await
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap().unwrap().id);
    }
    assert_eq!(ids.len(), 1);
    assert_eq!(pool.query_resources(&ctx).await.unwrap().len(), 2);

    pool.free_resource(&ctx, &ResourceKey::tag("customer1"))
        .await
        .unwrap();
    pool.destroy(&ctx).await.unwrap();
    manager.catalog().delete_resource_type(&ctx, rt.id).await.unwrap();
}
