//! Integration tests for singleton pools.

use resman::{
    AppError, BLUEPRINT_TAG, EntityStore, ErrorKind, Pool, PropertyValue, ResourceKey,
    StoreTransaction, with_transaction,
};
use resman_database::ResourceFilter;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_vlan_claim_free_reclaim_destroy() {
    let app = TestApp::new();
    let pool = app.singleton_pool("singleton", "vlan", 44).await;

    let first = pool.claim_resource(&app.ctx, Some("customer1")).await.unwrap();
    assert_eq!(first.property("vlan"), Some(&PropertyValue::Int(44)));
    assert_eq!(first.tag.as_deref(), Some("customer1"));

    pool.free_resource(&app.ctx, &ResourceKey::tag("customer1"))
        .await
        .unwrap();
    let err = pool
        .query_resource(&app.ctx, &ResourceKey::tag("customer1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let second = pool.claim_resource(&app.ctx, Some("customer1")).await.unwrap();
    assert_ne!(second.id, first.id);
    assert_eq!(second.property("vlan"), Some(&PropertyValue::Int(44)));

    pool.free_resource(&app.ctx, &ResourceKey::tag("customer1"))
        .await
        .unwrap();
    pool.destroy(&app.ctx).await.unwrap();

    let stats = app.stats().await;
    assert_eq!(stats.resources, 0);
    assert_eq!(stats.properties, 0);
    assert_eq!(stats.tags, 0);
    assert_eq!(stats.pools, 0);
}

#[tokio::test]
async fn test_claim_is_idempotent_per_tag() {
    let app = TestApp::new();
    let pool = app.singleton_pool("singleton", "vlan", 44).await;

    let first = pool.claim_resource(&app.ctx, Some("customer1")).await.unwrap();
    let again = pool.claim_resource(&app.ctx, Some("customer1")).await.unwrap();
    assert_eq!(first, again);

    let other = pool.claim_resource(&app.ctx, Some("customer2")).await.unwrap();
    assert_ne!(other.id, first.id);
    assert_eq!(other.property("vlan"), first.property("vlan"));
}

#[tokio::test]
async fn test_reclaim_after_free_is_a_new_copy() {
    let app = TestApp::new();
    let pool = app.singleton_pool("singleton", "vlan", 10).await;

    let first = pool.claim_resource(&app.ctx, Some("t")).await.unwrap();
    pool.free_resource(&app.ctx, &ResourceKey::tag("t")).await.unwrap();
    let second = pool.claim_resource(&app.ctx, Some("t")).await.unwrap();

    assert_ne!(first.id, second.id);
    assert_ne!(first.properties[0].id, second.properties[0].id);
    assert_eq!(first.properties[0].value, second.properties[0].value);
}

#[tokio::test]
async fn test_blueprint_tag_is_protected() {
    let app = TestApp::new();
    let pool = app.singleton_pool("singleton", "vlan", 44).await;

    pool.free_resource(&app.ctx, &ResourceKey::tag(BLUEPRINT_TAG))
        .await
        .unwrap();
    let blueprint = pool.blueprint(&app.ctx).await.unwrap();
    assert!(blueprint.is_blueprint());

    let err = pool
        .claim_resource(&app.ctx, Some(BLUEPRINT_TAG))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let err = pool.claim_resource(&app.ctx, None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let err = pool
        .free_resource(&app.ctx, &ResourceKey::tag("nobody"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_tag_is_matched_exactly_as_claimed() {
    let app = TestApp::new();
    let pool = app.singleton_pool("singleton", "vlan", 44).await;

    let claimed = pool
        .claim_resource(&app.ctx, Some(" customer1 "))
        .await
        .unwrap();
    assert_eq!(claimed.tag.as_deref(), Some(" customer1 "));

    let found = pool
        .query_resource(&app.ctx, &ResourceKey::tag(" customer1 "))
        .await
        .unwrap();
    assert_eq!(found.id, claimed.id);
    let err = pool
        .query_resource(&app.ctx, &ResourceKey::tag("customer1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    pool.free_resource(&app.ctx, &ResourceKey::tag(" customer1 "))
        .await
        .unwrap();
    assert_eq!(app.stats().await.tags, 1);

    let err = pool.claim_resource(&app.ctx, Some("   ")).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_blueprint_read_in_outer_transaction() {
    let app = TestApp::new();
    let pool = app.singleton_pool("singleton", "vlan", 44).await;

    let work_pool = pool.clone();
    let ctx = app.ctx.clone();
    let (blueprint, claimed) = with_transaction(app.manager.store().as_ref(), &app.ctx, |tx| {
        Box::pin(async move {
            let blueprint = work_pool.blueprint_in(tx, &ctx).await?;
            let claimed = work_pool
                .claim_resource_in(tx, &ctx, Some("customer1"))
                .await?;
            Ok::<_, AppError>((blueprint, claimed))
        })
    })
    .await
    .unwrap();

    assert!(blueprint.is_blueprint());
    assert_eq!(claimed.property("vlan"), blueprint.property("vlan"));
    assert_ne!(claimed.id, blueprint.id);
}

#[tokio::test]
async fn test_query_resources_includes_blueprint() {
    let app = TestApp::new();
    let pool = app.singleton_pool("singleton", "vlan", 44).await;

    let only_blueprint = pool.query_resources(&app.ctx).await.unwrap();
    assert_eq!(only_blueprint.len(), 1);
    assert!(only_blueprint[0].is_blueprint());

    pool.claim_resource(&app.ctx, Some("customer1")).await.unwrap();
    let listed = pool.query_resources(&app.ctx).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed.iter().filter(|r| !r.is_blueprint()).count(), 1);
}

#[tokio::test]
async fn test_destroy_blocked_by_claims() {
    let app = TestApp::new();
    let pool = app.singleton_pool("singleton", "vlan", 44).await;

    pool.claim_resource(&app.ctx, Some("customer1")).await.unwrap();
    let err = pool.destroy(&app.ctx).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::PoolInUse);
    assert_eq!(app.stats().await.pools, 1);
}

#[tokio::test]
async fn test_missing_blueprint_is_reported() {
    let app = TestApp::new();
    let pool = app.singleton_pool("singleton", "vlan", 44).await;

    let mut tx = app.manager.store().begin().await.unwrap();
    let blueprint = tx
        .find_resources(&ResourceFilter::in_pool(pool.record().id).tagged(BLUEPRINT_TAG))
        .await
        .unwrap()
        .remove(0);
    tx.delete_resource(blueprint.id).await.unwrap();
    tx.commit().await.unwrap();

    let err = pool
        .claim_resource(&app.ctx, Some("customer1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::BlueprintMissing);

    // A pool without its blueprint can still be torn down.
    pool.destroy(&app.ctx).await.unwrap();
    assert_eq!(app.stats().await.pools, 0);
}

#[tokio::test]
async fn test_concurrent_claims_for_one_tag_converge() {
    let app = TestApp::new();
    let pool = app.singleton_pool("singleton", "vlan", 44).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let pool = pool.clone();
        let ctx = app.ctx.clone();
        handles.push(tokio::spawn(async move {
            pool.claim_resource(&ctx, Some("customer1")).await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(app.stats().await.tags, 2);
}
