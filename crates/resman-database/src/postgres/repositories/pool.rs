//! Resource pool queries.

use sqlx::PgConnection;

use resman_core::result::AppResult;
use resman_core::types::{PoolId, ResourceTypeId};
use resman_entity::{NewResourcePool, ResourcePool};

use crate::postgres::error::db_error;

const COLUMNS: &str = "id, name, pool_type, resource_type_id, created_at";

/// Insert a pool row.
pub async fn create(conn: &mut PgConnection, input: &NewResourcePool) -> AppResult<ResourcePool> {
    sqlx::query_as::<_, ResourcePool>(&format!(
        "INSERT INTO resource_pools (name, pool_type, resource_type_id) VALUES ($1, $2, $3) RETURNING {COLUMNS}"
    ))
    .bind(&input.name)
    .bind(input.pool_type.as_str())
    .bind(input.resource_type_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| db_error(e, "Failed to create pool"))
}

/// Find a pool by ID.
pub async fn find_by_id(conn: &mut PgConnection, id: PoolId) -> AppResult<Option<ResourcePool>> {
    sqlx::query_as::<_, ResourcePool>(&format!(
        "SELECT {COLUMNS} FROM resource_pools WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| db_error(e, "Failed to find pool"))
}

/// Find a pool by ID, locking its row until the transaction ends.
pub async fn lock_by_id(conn: &mut PgConnection, id: PoolId) -> AppResult<Option<ResourcePool>> {
    sqlx::query_as::<_, ResourcePool>(&format!(
        "SELECT {COLUMNS} FROM resource_pools WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| db_error(e, "Failed to lock pool"))
}

/// Find a pool by name.
pub async fn find_by_name(conn: &mut PgConnection, name: &str) -> AppResult<Option<ResourcePool>> {
    sqlx::query_as::<_, ResourcePool>(&format!(
        "SELECT {COLUMNS} FROM resource_pools WHERE name = $1"
    ))
    .bind(name)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| db_error(e, "Failed to find pool"))
}

/// List all pools.
pub async fn find_all(conn: &mut PgConnection) -> AppResult<Vec<ResourcePool>> {
    sqlx::query_as::<_, ResourcePool>(&format!(
        "SELECT {COLUMNS} FROM resource_pools ORDER BY id"
    ))
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| db_error(e, "Failed to list pools"))
}

/// Number of pools using a resource type.
pub async fn count_by_resource_type(
    conn: &mut PgConnection,
    resource_type_id: ResourceTypeId,
) -> AppResult<u64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM resource_pools WHERE resource_type_id = $1")
            .bind(resource_type_id)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| db_error(e, "Failed to count pools"))?;
    Ok(count as u64)
}

/// Delete a pool row.
pub async fn delete(conn: &mut PgConnection, id: PoolId) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM resource_pools WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| db_error(e, "Failed to delete pool"))?;
    Ok(result.rows_affected() > 0)
}
