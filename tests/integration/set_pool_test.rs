//! Integration tests for set pools.

use std::collections::HashSet;

use futures::future::join_all;
use resman::{ErrorKind, Pool, PropertyValue, ResourceKey, raw_props};

use crate::helpers::{TestApp, int_props};

#[tokio::test]
async fn test_two_claims_then_exhausted() {
    let app = TestApp::new();
    let pool = app.set_pool("set", "a", &[1, 2]).await;

    let first = pool.claim_resource(&app.ctx, None).await.unwrap();
    let second = pool.claim_resource(&app.ctx, None).await.unwrap();
    assert_ne!(first.id, second.id);

    let values: HashSet<_> = [&first, &second]
        .iter()
        .map(|r| r.property("a").cloned())
        .collect();
    assert_eq!(
        values,
        HashSet::from([Some(PropertyValue::Int(1)), Some(PropertyValue::Int(2))])
    );

    let err = pool.claim_resource(&app.ctx, None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::PoolExhausted);
}

#[tokio::test]
async fn test_free_makes_resource_claimable_again() {
    let app = TestApp::new();
    let pool = app.set_pool("set", "a", &[7]).await;

    let claimed = pool.claim_resource(&app.ctx, Some("ignored")).await.unwrap();
    pool.free_resource(&app.ctx, &ResourceKey::properties(int_props("a", 7)))
        .await
        .unwrap();

    let reclaimed = pool.claim_resource(&app.ctx, None).await.unwrap();
    assert_eq!(reclaimed.id, claimed.id);
    assert!(reclaimed.claimed);
}

#[tokio::test]
async fn test_free_errors() {
    let app = TestApp::new();
    let pool = app.set_pool("set", "a", &[1, 2]).await;

    let err = pool
        .free_resource(&app.ctx, &ResourceKey::properties(int_props("a", 1)))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotClaimed);

    let err = pool
        .free_resource(&app.ctx, &ResourceKey::properties(int_props("a", 99)))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AmbiguousOrNotFound);

    let err = pool
        .free_resource(&app.ctx, &ResourceKey::properties(raw_props([("b", 1)])))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownProperty);

    let err = pool
        .free_resource(&app.ctx, &ResourceKey::tag("customer1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_queries_only_see_claimed_resources() {
    let app = TestApp::new();
    let pool = app.set_pool("set", "a", &[1, 2]).await;

    assert!(pool.query_resources(&app.ctx).await.unwrap().is_empty());

    let claimed = pool.claim_resource(&app.ctx, None).await.unwrap();
    let value = claimed.property("a").and_then(PropertyValue::as_int).unwrap();
    let other = if value == 1 { 2 } else { 1 };

    let listed = pool.query_resources(&app.ctx).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, claimed.id);

    let found = pool
        .query_resource(&app.ctx, &ResourceKey::properties(int_props("a", value)))
        .await
        .unwrap();
    assert_eq!(found.id, claimed.id);

    let err = pool
        .query_resource(&app.ctx, &ResourceKey::properties(int_props("a", other)))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AmbiguousOrNotFound);
}

#[tokio::test]
async fn test_destroy_blocked_while_claimed() {
    let app = TestApp::new();
    let pool = app.set_pool("set", "a", &[1, 2]).await;

    let claimed = pool.claim_resource(&app.ctx, None).await.unwrap();
    assert!(!pool.query_resources(&app.ctx).await.unwrap().is_empty());

    let err = pool.destroy(&app.ctx).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::PoolInUse);

    let value = claimed.property("a").and_then(PropertyValue::as_int).unwrap();
    pool.free_resource(&app.ctx, &ResourceKey::properties(int_props("a", value)))
        .await
        .unwrap();
    pool.destroy(&app.ctx).await.unwrap();

    let stats = app.stats().await;
    assert_eq!(stats.pools, 0);
    assert_eq!(stats.resources, 0);
    assert_eq!(stats.properties, 0);
}

#[tokio::test]
async fn test_concurrent_claims_never_share_a_resource() {
    let app = TestApp::new();
    let values: Vec<i64> = (1..=16).collect();
    let pool = app.set_pool("set", "a", &values).await;

    let attempts = (0..32).map(|_| {
        let pool = pool.clone();
        let ctx = app.ctx.clone();
        tokio::spawn(async move { pool.claim_resource(&ctx, None).await })
    });

    let mut claimed = HashSet::new();
    let mut exhausted = 0;
    for outcome in join_all(attempts).await {
        match outcome.unwrap() {
            Ok(resource) => assert!(claimed.insert(resource.id), "double claim"),
            Err(e) => {
                assert_eq!(e.kind, ErrorKind::PoolExhausted);
                exhausted += 1;
            }
        }
    }

    assert_eq!(claimed.len(), 16);
    assert_eq!(exhausted, 16);
}
