//! Resource, property and tag queries.

use std::collections::HashMap;

use sqlx::{PgConnection, Postgres, QueryBuilder};

use resman_core::result::AppResult;
use resman_core::types::{PoolId, PropertyTypeId, ResourceId};
use resman_entity::{Property, PropertyValue, Resource};

use crate::postgres::error::db_error;
use crate::store::ResourceFilter;

const SELECT_RESOURCES: &str = "SELECT r.id, r.pool_id, r.claimed, r.created_at, t.tag \
     FROM resources r LEFT JOIN tags t ON t.resource_id = r.id WHERE TRUE";

const COUNT_RESOURCES: &str =
    "SELECT COUNT(*) FROM resources r LEFT JOIN tags t ON t.resource_id = r.id WHERE TRUE";

/// Insert a resource and, if given, its tag.
pub async fn create(
    conn: &mut PgConnection,
    pool_id: PoolId,
    claimed: bool,
    tag: Option<&str>,
) -> AppResult<Resource> {
    let mut resource = sqlx::query_as::<_, Resource>(
        "INSERT INTO resources (pool_id, claimed) VALUES ($1, $2) \
         RETURNING id, pool_id, claimed, created_at, NULL::TEXT AS tag",
    )
    .bind(pool_id)
    .bind(claimed)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| db_error(e, "Failed to create resource"))?;

    if let Some(tag) = tag {
        sqlx::query("INSERT INTO tags (pool_id, resource_id, tag) VALUES ($1, $2, $3)")
            .bind(pool_id)
            .bind(resource.id)
            .bind(tag)
            .execute(&mut *conn)
            .await
            .map_err(|e| db_error(e, "Failed to tag resource"))?;
        resource.tag = Some(tag.to_string());
    }

    Ok(resource)
}

/// Attach a property value to a resource.
pub async fn create_property(
    conn: &mut PgConnection,
    resource_id: ResourceId,
    property_type_id: PropertyTypeId,
    value: &PropertyValue,
) -> AppResult<Property> {
    let (int_val, string_val) = value.to_db_values();
    sqlx::query_as::<_, Property>(
        "INSERT INTO properties (resource_id, property_type_id, int_val, string_val) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, resource_id, property_type_id, \
         (SELECT name FROM property_types WHERE id = $2) AS name, int_val, string_val",
    )
    .bind(resource_id)
    .bind(property_type_id)
    .bind(int_val)
    .bind(string_val)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| db_error(e, "Failed to create property"))
}

/// Resources matching the filter, with properties loaded.
pub async fn find(conn: &mut PgConnection, filter: &ResourceFilter) -> AppResult<Vec<Resource>> {
    let mut qb = QueryBuilder::<Postgres>::new(SELECT_RESOURCES);
    push_filter(&mut qb, filter);
    qb.push(" ORDER BY r.id");

    let mut resources = qb
        .build_query_as::<Resource>()
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| db_error(e, "Failed to query resources"))?;

    load_properties(conn, &mut resources).await?;
    Ok(resources)
}

/// Number of resources matching the filter.
pub async fn count(conn: &mut PgConnection, filter: &ResourceFilter) -> AppResult<u64> {
    let mut qb = QueryBuilder::<Postgres>::new(COUNT_RESOURCES);
    push_filter(&mut qb, filter);

    let count: i64 = qb
        .build_query_scalar::<i64>()
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| db_error(e, "Failed to count resources"))?;
    Ok(count as u64)
}

/// Claim one unclaimed resource of the pool (SKIP LOCKED for concurrency).
pub async fn claim_first_unclaimed(
    conn: &mut PgConnection,
    pool_id: PoolId,
) -> AppResult<Option<Resource>> {
    let claimed = sqlx::query_as::<_, Resource>(
        "UPDATE resources SET claimed = TRUE \
         WHERE id = ( \
            SELECT id FROM resources \
            WHERE pool_id = $1 AND claimed = FALSE \
            ORDER BY id \
            LIMIT 1 \
            FOR UPDATE SKIP LOCKED \
         ) RETURNING id, pool_id, claimed, created_at, NULL::TEXT AS tag",
    )
    .bind(pool_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| db_error(e, "Failed to claim resource"))?;

    match claimed {
        Some(resource) => {
            let mut resources = vec![resource];
            load_properties(conn, &mut resources).await?;
            Ok(resources.pop())
        }
        None => Ok(None),
    }
}

/// Conditionally flip the claim flag.
pub async fn compare_and_set_claimed(
    conn: &mut PgConnection,
    resource_id: ResourceId,
    expected: bool,
    claimed: bool,
) -> AppResult<bool> {
    let result = sqlx::query("UPDATE resources SET claimed = $3 WHERE id = $1 AND claimed = $2")
        .bind(resource_id)
        .bind(expected)
        .bind(claimed)
        .execute(&mut *conn)
        .await
        .map_err(|e| db_error(e, "Failed to update claim flag"))?;
    Ok(result.rows_affected() == 1)
}

/// Delete a resource with its properties and tag.
pub async fn delete(conn: &mut PgConnection, resource_id: ResourceId) -> AppResult<bool> {
    sqlx::query("DELETE FROM properties WHERE resource_id = $1")
        .bind(resource_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| db_error(e, "Failed to delete resource properties"))?;

    sqlx::query("DELETE FROM tags WHERE resource_id = $1")
        .bind(resource_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| db_error(e, "Failed to delete resource tag"))?;

    let result = sqlx::query("DELETE FROM resources WHERE id = $1")
        .bind(resource_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| db_error(e, "Failed to delete resource"))?;
    Ok(result.rows_affected() > 0)
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ResourceFilter) {
    if let Some(pool_id) = filter.pool_id {
        qb.push(" AND r.pool_id = ").push_bind(pool_id);
    }
    if let Some(claimed) = filter.claimed {
        qb.push(" AND r.claimed = ").push_bind(claimed);
    }
    if let Some(tag) = &filter.tag {
        qb.push(" AND t.tag = ").push_bind(tag.clone());
    }
    if let Some(tag) = &filter.exclude_tag {
        qb.push(" AND (t.tag IS NULL OR t.tag <> ")
            .push_bind(tag.clone())
            .push(")");
    }
    for predicate in &filter.properties {
        qb.push(
            " AND EXISTS (SELECT 1 FROM properties p WHERE p.resource_id = r.id AND p.property_type_id = ",
        )
        .push_bind(predicate.property_type_id);
        match &predicate.value {
            PropertyValue::Int(v) => qb.push(" AND p.int_val = ").push_bind(*v),
            PropertyValue::String(v) => qb.push(" AND p.string_val = ").push_bind(v.clone()),
        };
        qb.push(")");
    }
}

async fn load_properties(conn: &mut PgConnection, resources: &mut [Resource]) -> AppResult<()> {
    if resources.is_empty() {
        return Ok(());
    }

    let ids: Vec<i64> = resources.iter().map(|r| r.id.get()).collect();
    let properties = sqlx::query_as::<_, Property>(
        "SELECT p.id, p.resource_id, p.property_type_id, pt.name, p.int_val, p.string_val \
         FROM properties p JOIN property_types pt ON pt.id = p.property_type_id \
         WHERE p.resource_id = ANY($1) ORDER BY p.id",
    )
    .bind(ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| db_error(e, "Failed to load resource properties"))?;

    let mut by_resource: HashMap<ResourceId, Vec<Property>> = HashMap::new();
    for property in properties {
        by_resource
            .entry(property.resource_id)
            .or_default()
            .push(property);
    }
    for resource in resources.iter_mut() {
        resource.properties = by_resource.remove(&resource.id).unwrap_or_default();
    }
    Ok(())
}
