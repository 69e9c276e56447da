//! Resource-type and property-type administration.
//!
//! Changes to a resource type's declaration are refused once pools or
//! stored property values depend on it.

use std::sync::Arc;

use tracing::{info, instrument};
use validator::Validate;

use resman_core::error::AppError;
use resman_core::result::AppResult;
use resman_core::types::{PropertyTypeId, ResourceTypeId};
use resman_database::{EntityStore, StoreTransaction};
use resman_entity::{NewPropertyType, NewResourceType, PropertyKind, PropertyType, ResourceType};

use crate::context::RequestContext;
use crate::transaction::with_owned_transaction;

/// Manages resource types and their property types.
#[derive(Clone)]
pub struct ResourceCatalog {
    store: Arc<dyn EntityStore>,
}

impl std::fmt::Debug for ResourceCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCatalog").finish_non_exhaustive()
    }
}

impl ResourceCatalog {
    /// Creates a catalog over an entity store.
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Creates a resource type together with its property types.
    #[instrument(skip_all, fields(resource_type = %input.name, request_id = %ctx.request_id))]
    pub async fn create_resource_type(
        &self,
        ctx: &RequestContext,
        input: NewResourceType,
    ) -> AppResult<ResourceType> {
        input.validate()?;
        for pt in &input.property_types {
            check_declaration(pt)?;
        }

        let created = with_owned_transaction(self.store.as_ref(), ctx, input, |input, _ctx, tx| {
            Box::pin(async move { create_resource_type_in(tx, &input).await })
        })
        .await?;

        info!(id = %created.id, "Resource type created");
        Ok(created)
    }

    /// Renames a resource type.
    pub async fn rename_resource_type(
        &self,
        ctx: &RequestContext,
        id: ResourceTypeId,
        name: &str,
    ) -> AppResult<ResourceType> {
        NewResourceType::new(name).validate()?;
        let name = name.to_string();

        with_owned_transaction(self.store.as_ref(), ctx, name, move |name, _ctx, tx| {
            Box::pin(async move {
                tx.rename_resource_type(id, &name)
                    .await?
                    .ok_or_else(|| resource_type_not_found(id))
            })
        })
        .await
    }

    /// Deletes a resource type and its property types.
    ///
    /// Refused with `Conflict` while any pool uses the type.
    #[instrument(skip_all, fields(resource_type_id = %id, request_id = %ctx.request_id))]
    pub async fn delete_resource_type(&self, ctx: &RequestContext, id: ResourceTypeId) -> AppResult<()> {
        with_owned_transaction(self.store.as_ref(), ctx, (), move |_, _ctx, tx| {
            Box::pin(async move { delete_resource_type_in(tx, id).await })
        })
        .await?;
        info!("Resource type deleted");
        Ok(())
    }

    /// Declares a new property type on a resource type.
    ///
    /// Refused with `Conflict` while any pool uses the type.
    pub async fn add_property_type(
        &self,
        ctx: &RequestContext,
        resource_type_id: ResourceTypeId,
        input: NewPropertyType,
    ) -> AppResult<PropertyType> {
        input.validate()?;
        check_declaration(&input)?;

        with_owned_transaction(self.store.as_ref(), ctx, input, move |input, _ctx, tx| {
            Box::pin(async move {
                require_unused_type(tx, resource_type_id).await?;
                tx.create_property_type(resource_type_id, &input).await
            })
        })
        .await
    }

    /// Removes a property type from a resource type.
    ///
    /// Refused with `Conflict` while any pool uses the type.
    pub async fn remove_property_type(
        &self,
        ctx: &RequestContext,
        resource_type_id: ResourceTypeId,
        property_type_id: PropertyTypeId,
    ) -> AppResult<()> {
        with_owned_transaction(self.store.as_ref(), ctx, (), move |_, _ctx, tx| {
            Box::pin(async move {
                let pt = find_property_type(tx, property_type_id).await?;
                if pt.resource_type_id != resource_type_id {
                    return Err(AppError::not_found(format!(
                        "Property type {property_type_id} is not declared on resource type {resource_type_id}"
                    )));
                }
                require_unused_type(tx, resource_type_id).await?;
                tx.delete_property_type(property_type_id).await?;
                Ok::<_, AppError>(())
            })
        })
        .await
    }

    /// Overwrites a property type's declaration.
    ///
    /// Refused with `Conflict` while stored properties reference it, and
    /// when it would become mandatory while any pool uses its resource type.
    pub async fn update_property_type(
        &self,
        ctx: &RequestContext,
        id: PropertyTypeId,
        input: NewPropertyType,
    ) -> AppResult<PropertyType> {
        input.validate()?;
        check_declaration(&input)?;

        with_owned_transaction(self.store.as_ref(), ctx, input, move |input, _ctx, tx| {
            Box::pin(async move {
                let current = require_unreferenced(tx, id).await?;
                if input.mandatory && !current.mandatory {
                    require_unused_type(tx, current.resource_type_id).await?;
                }
                tx.update_property_type(id, &input)
                    .await?
                    .ok_or_else(|| property_type_not_found(id))
            })
        })
        .await
    }

    /// Deletes a property type.
    ///
    /// Refused with `Conflict` while stored properties reference it.
    pub async fn delete_property_type(&self, ctx: &RequestContext, id: PropertyTypeId) -> AppResult<()> {
        with_owned_transaction(self.store.as_ref(), ctx, (), move |_, _ctx, tx| {
            Box::pin(async move {
                require_unreferenced(tx, id).await?;
                tx.delete_property_type(id).await?;
                Ok::<_, AppError>(())
            })
        })
        .await
    }

    /// Lists all resource types.
    pub async fn list_resource_types(&self, ctx: &RequestContext) -> AppResult<Vec<ResourceType>> {
        with_owned_transaction(self.store.as_ref(), ctx, (), |_, _ctx, tx| {
            Box::pin(async move { tx.list_resource_types().await })
        })
        .await
    }

    /// Gets a resource type by ID.
    pub async fn get_resource_type(
        &self,
        ctx: &RequestContext,
        id: ResourceTypeId,
    ) -> AppResult<ResourceType> {
        with_owned_transaction(self.store.as_ref(), ctx, (), move |_, _ctx, tx| {
            Box::pin(async move { find_resource_type(tx, id).await })
        })
        .await
    }

    /// Gets a resource type by name.
    pub async fn find_resource_type(
        &self,
        ctx: &RequestContext,
        name: &str,
    ) -> AppResult<ResourceType> {
        with_owned_transaction(self.store.as_ref(), ctx, name.to_string(), |name, _ctx, tx| {
            Box::pin(async move {
                tx.find_resource_type_by_name(&name)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("Resource type \"{name}\" not found")))
            })
        })
        .await
    }

    /// Property types declared on a resource type.
    pub async fn property_types(
        &self,
        ctx: &RequestContext,
        resource_type_id: ResourceTypeId,
    ) -> AppResult<Vec<PropertyType>> {
        with_owned_transaction(self.store.as_ref(), ctx, (), move |_, _ctx, tx| {
            Box::pin(async move {
                find_resource_type(tx, resource_type_id).await?;
                tx.property_types(resource_type_id).await
            })
        })
        .await
    }
}

/// Check that a declaration's kind is supported and its default matches it.
fn check_declaration(input: &NewPropertyType) -> AppResult<()> {
    let kind: PropertyKind = input.value_type.parse().map_err(|_| {
        AppError::unsupported_property_type(format!(
            "Unsupported property type \"{}\" for property \"{}\"",
            input.value_type, input.name
        ))
    })?;

    if let Some(default) = &input.default_value {
        if default.kind() != kind {
            return Err(AppError::invalid_property_value(format!(
                "Default value {default} of property \"{}\" is not a valid {kind}",
                input.name
            )));
        }
    }
    Ok(())
}

async fn create_resource_type_in(
    tx: &mut dyn StoreTransaction,
    input: &NewResourceType,
) -> AppResult<ResourceType> {
    let resource_type = tx.create_resource_type(&input.name).await?;
    for pt in &input.property_types {
        tx.create_property_type(resource_type.id, pt).await?;
    }
    Ok(resource_type)
}

async fn delete_resource_type_in(tx: &mut dyn StoreTransaction, id: ResourceTypeId) -> AppResult<()> {
    find_resource_type(tx, id).await?;
    require_unused_type(tx, id).await?;

    for pt in tx.property_types(id).await? {
        tx.delete_property_type(pt.id).await?;
    }
    tx.delete_resource_type(id).await?;
    Ok(())
}

async fn find_resource_type(
    tx: &mut dyn StoreTransaction,
    id: ResourceTypeId,
) -> AppResult<ResourceType> {
    tx.find_resource_type(id)
        .await?
        .ok_or_else(|| resource_type_not_found(id))
}

async fn find_property_type(
    tx: &mut dyn StoreTransaction,
    id: PropertyTypeId,
) -> AppResult<PropertyType> {
    tx.find_property_type(id)
        .await?
        .ok_or_else(|| property_type_not_found(id))
}

/// Fails with `Conflict` when any pool uses the resource type.
async fn require_unused_type(tx: &mut dyn StoreTransaction, id: ResourceTypeId) -> AppResult<()> {
    find_resource_type(tx, id).await?;
    let pools = tx.count_pools_of_type(id).await?;
    if pools > 0 {
        return Err(AppError::conflict(format!(
            "Resource type {id} is used by {pools} pools"
        )));
    }
    Ok(())
}

/// Fails with `Conflict` when stored properties reference the property type.
async fn require_unreferenced(
    tx: &mut dyn StoreTransaction,
    id: PropertyTypeId,
) -> AppResult<PropertyType> {
    let property_type = find_property_type(tx, id).await?;
    let properties = tx.count_properties_of_type(id).await?;
    if properties > 0 {
        return Err(AppError::conflict(format!(
            "Property type {id} is referenced by {properties} properties"
        )));
    }
    Ok(property_type)
}

fn resource_type_not_found(id: ResourceTypeId) -> AppError {
    AppError::not_found(format!("Resource type {id} not found"))
}

fn property_type_not_found(id: PropertyTypeId) -> AppError {
    AppError::not_found(format!("Property type {id} not found"))
}
