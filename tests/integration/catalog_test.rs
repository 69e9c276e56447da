//! Integration tests for resource-type administration against live pools.

use resman::{
    ErrorKind, NewPropertyType, NewResourceType, Pool, PropertyKind, ResourceKey, raw_props,
};

use crate::helpers::TestApp;

#[tokio::test]
async fn test_types_in_use_are_locked() {
    let app = TestApp::new();
    let catalog = app.manager.catalog();
    let pool = app.singleton_pool("singleton", "vlan", 44).await;
    let rt_id = pool.record().resource_type_id;
    let vlan = catalog.property_types(&app.ctx, rt_id).await.unwrap().remove(0);

    let err = catalog.delete_resource_type(&app.ctx, rt_id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let err = catalog
        .add_property_type(&app.ctx, rt_id, NewPropertyType::optional("mtu", PropertyKind::Int))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let err = catalog
        .remove_property_type(&app.ctx, rt_id, vlan.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    // The blueprint holds a property of this type.
    let err = catalog.delete_property_type(&app.ctx, vlan.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let renamed = catalog.rename_resource_type(&app.ctx, rt_id, "vlan-id").await.unwrap();
    assert_eq!(renamed.name, "vlan-id");
}

#[tokio::test]
async fn test_types_unlock_after_pool_destroyed() {
    let app = TestApp::new();
    let catalog = app.manager.catalog();
    let pool = app.singleton_pool("singleton", "vlan", 44).await;
    let rt_id = pool.record().resource_type_id;

    pool.claim_resource(&app.ctx, Some("customer1")).await.unwrap();
    pool.free_resource(&app.ctx, &ResourceKey::tag("customer1"))
        .await
        .unwrap();
    pool.destroy(&app.ctx).await.unwrap();

    catalog.delete_resource_type(&app.ctx, rt_id).await.unwrap();

    let stats = app.stats().await;
    assert_eq!(stats.resource_types, 0);
    assert_eq!(stats.property_types, 0);
}

#[tokio::test]
async fn test_optional_property_cannot_turn_mandatory_under_live_pool() {
    let app = TestApp::new();
    let catalog = app.manager.catalog();
    let rt = catalog
        .create_resource_type(
            &app.ctx,
            NewResourceType::new("port")
                .with_property(NewPropertyType::mandatory("vlan", PropertyKind::Int))
                .with_property(NewPropertyType::optional("mtu", PropertyKind::Int)),
        )
        .await
        .unwrap();
    let mtu = catalog
        .property_types(&app.ctx, rt.id)
        .await
        .unwrap()
        .into_iter()
        .find(|pt| pt.name == "mtu")
        .unwrap();

    let pool = app
        .manager
        .pools()
        .create_set_pool(&app.ctx, rt.id, "ports", vec![raw_props([("vlan", 1)])])
        .await
        .unwrap();

    let err = catalog
        .update_property_type(
            &app.ctx,
            mtu.id,
            NewPropertyType::mandatory("mtu", PropertyKind::Int),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let claimed = pool.claim_resource(&app.ctx, None).await.unwrap();
    assert_eq!(claimed.property("mtu"), None);
    pool.free_resource(&app.ctx, &ResourceKey::properties(raw_props([("vlan", 1)])))
        .await
        .unwrap();

    // Still optional: the declaration may change while the pool lives.
    let renamed = catalog
        .update_property_type(
            &app.ctx,
            mtu.id,
            NewPropertyType::optional("mtu-bytes", PropertyKind::Int),
        )
        .await
        .unwrap();
    assert!(!renamed.mandatory);

    pool.destroy(&app.ctx).await.unwrap();
    let updated = catalog
        .update_property_type(
            &app.ctx,
            mtu.id,
            NewPropertyType::mandatory("mtu", PropertyKind::Int),
        )
        .await
        .unwrap();
    assert!(updated.mandatory);
}
