//! Integration tests for pool creation and lookup.

use resman::{
    ErrorKind, NewPropertyType, NewResourceType, Pool, PoolType, PropertyKind, PropertyValue,
    RawResourceProps, raw_props,
};

use crate::helpers::{TestApp, int_props};

#[tokio::test]
async fn test_missing_mandatory_property_creates_nothing() {
    let app = TestApp::new();
    let rt = app.int_type("vlan").await;
    let before = app.stats().await;

    let err = app
        .manager
        .pools()
        .create_singleton_pool(&app.ctx, rt.id, "singleton", RawResourceProps::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::PoolCreation);
    assert_eq!(err.root_kind(), ErrorKind::MissingMandatoryProperty);

    let err = app
        .manager
        .pools()
        .create_set_pool(
            &app.ctx,
            rt.id,
            "set",
            vec![int_props("vlan", 1), RawResourceProps::new()],
        )
        .await
        .unwrap_err();
    assert!(err.has_kind(ErrorKind::MissingMandatoryProperty));

    assert_eq!(app.stats().await, before);
}

#[tokio::test]
async fn test_creation_rejects_bad_input() {
    let app = TestApp::new();
    let rt = app.int_type("vlan").await;
    let pools = app.manager.pools();

    let err = pools
        .create_set_pool(&app.ctx, rt.id, "set", vec![int_props("vlan", 1), int_props("vlan", 1)])
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::PoolCreation);

    let err = pools
        .create_set_pool(&app.ctx, rt.id, "set", vec![raw_props([("vlan", "x")])])
        .await
        .unwrap_err();
    assert_eq!(err.root_kind(), ErrorKind::InvalidPropertyValue);

    let err = pools
        .create_set_pool(&app.ctx, rt.id, "", vec![])
        .await
        .unwrap_err();
    assert_eq!(err.root_kind(), ErrorKind::Validation);

    pools
        .create_set_pool(&app.ctx, rt.id, "set", vec![int_props("vlan", 1)])
        .await
        .unwrap();
    let err = pools
        .create_singleton_pool(&app.ctx, rt.id, "set", int_props("vlan", 2))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::PoolCreation);
    assert_eq!(err.root_kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_existing_pool_dispatches_on_type() {
    let app = TestApp::new();
    let set = app.set_pool("set", "a", &[1]).await;
    let singleton = app.singleton_pool("singleton", "vlan", 44).await;
    let pools = app.manager.pools();

    let by_name = pools.existing_pool(&app.ctx, "set").await.unwrap();
    assert_eq!(by_name.pool_type(), PoolType::Set);
    assert!(by_name.as_set().is_some());
    assert_eq!(by_name.record().id, set.record().id);

    let by_id = pools
        .existing_pool_from_id(&app.ctx, singleton.record().id)
        .await
        .unwrap();
    assert_eq!(by_id.pool_type(), PoolType::Singleton);
    let claimed = by_id.claim_resource(&app.ctx, Some("customer1")).await.unwrap();
    assert_eq!(claimed.property("vlan"), Some(&PropertyValue::Int(44)));

    let err = pools.existing_pool(&app.ctx, "missing").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let listed = pools.list_pools(&app.ctx).await.unwrap();
    let names: Vec<_> = listed.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["set", "singleton"]);
}

#[tokio::test]
async fn test_delete_pool_by_id() {
    let app = TestApp::new();
    let pool = app.singleton_pool("singleton", "vlan", 44).await;
    let pools = app.manager.pools();

    pool.claim_resource(&app.ctx, Some("customer1")).await.unwrap();
    let err = pools
        .delete_pool(&app.ctx, pool.record().id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::PoolInUse);

    pool.free_resource(&app.ctx, &resman::ResourceKey::tag("customer1"))
        .await
        .unwrap();
    pools.delete_pool(&app.ctx, pool.record().id).await.unwrap();
    assert!(pools.list_pools(&app.ctx).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_optional_defaults_are_persisted() {
    let app = TestApp::new();
    let rt = app
        .manager
        .catalog()
        .create_resource_type(
            &app.ctx,
            NewResourceType::new("port")
                .with_property(NewPropertyType::mandatory("number", PropertyKind::Int))
                .with_property(
                    NewPropertyType::optional("speed", PropertyKind::String)
                        .with_default(PropertyValue::from("1G")),
                )
                .with_property(NewPropertyType::optional("note", PropertyKind::String)),
        )
        .await
        .unwrap();

    let pool = app
        .manager
        .pools()
        .create_set_pool(&app.ctx, rt.id, "ports", vec![raw_props([("number", "3")])])
        .await
        .unwrap();

    let port = pool.claim_resource(&app.ctx, None).await.unwrap();
    assert_eq!(port.property("number"), Some(&PropertyValue::Int(3)));
    assert_eq!(port.property("speed"), Some(&PropertyValue::from("1G")));
    assert_eq!(port.property("note"), None);
}
