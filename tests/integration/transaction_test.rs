//! Integration tests for cancellation and joined transactions.

use resman::{AppError, ErrorKind, Pool, ResourceKey, with_transaction};

use crate::helpers::{TestApp, int_props};

#[tokio::test]
async fn test_cancelled_request_commits_nothing() {
    let app = TestApp::new();
    let pool = app.set_pool("set", "a", &[1]).await;

    let cancelled = app.ctx.clone().with_cancellation(Default::default());
    cancelled.cancel();
    let err = pool.claim_resource(&cancelled, None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Cancelled);

    assert!(pool.query_resources(&app.ctx).await.unwrap().is_empty());
    pool.claim_resource(&app.ctx, None).await.unwrap();
}

#[tokio::test]
async fn test_joined_operations_commit_together() {
    let app = TestApp::new();
    let rt = app.int_type("vlan").await;
    let factory = app.manager.pools().clone();
    let ctx = app.ctx.clone();

    let claimed = with_transaction(app.manager.store().as_ref(), &app.ctx, move |tx| {
        Box::pin(async move {
            let pool = factory
                .create_singleton_pool_in(tx, &ctx, rt.id, "joined", &int_props("vlan", 5))
                .await?;
            pool.claim_resource_in(tx, &ctx, Some("customer1")).await
        })
    })
    .await
    .unwrap();
    assert_eq!(claimed.tag.as_deref(), Some("customer1"));

    let pool = app.manager.pools().existing_pool(&app.ctx, "joined").await.unwrap();
    let found = pool
        .query_resource(&app.ctx, &ResourceKey::tag("customer1"))
        .await
        .unwrap();
    assert_eq!(found.id, claimed.id);
}

#[tokio::test]
async fn test_joined_operations_roll_back_together() {
    let app = TestApp::new();
    let rt = app.int_type("vlan").await;
    let before = app.stats().await;
    let factory = app.manager.pools().clone();
    let ctx = app.ctx.clone();

    let err = with_transaction(app.manager.store().as_ref(), &app.ctx, move |tx| {
        Box::pin(async move {
            let pool = factory
                .create_set_pool_in(tx, &ctx, rt.id, "joined", &[int_props("vlan", 1)])
                .await?;
            pool.claim_resource_in(tx, &ctx, None).await?;
            pool.claim_resource_in(tx, &ctx, None).await?;
            Ok::<_, AppError>(())
        })
    })
    .await
    .unwrap_err();

    assert_eq!(err.kind, ErrorKind::PoolExhausted);
    assert_eq!(app.stats().await, before);
}
