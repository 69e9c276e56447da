//! Resource type queries.

use sqlx::PgConnection;

use resman_core::result::AppResult;
use resman_core::types::ResourceTypeId;
use resman_entity::ResourceType;

use crate::postgres::error::db_error;

/// Insert a resource type.
pub async fn create(conn: &mut PgConnection, name: &str) -> AppResult<ResourceType> {
    sqlx::query_as::<_, ResourceType>(
        "INSERT INTO resource_types (name) VALUES ($1) RETURNING id, name, created_at",
    )
    .bind(name)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| db_error(e, "Failed to create resource type"))
}

/// Find a resource type by ID.
pub async fn find_by_id(
    conn: &mut PgConnection,
    id: ResourceTypeId,
) -> AppResult<Option<ResourceType>> {
    sqlx::query_as::<_, ResourceType>(
        "SELECT id, name, created_at FROM resource_types WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| db_error(e, "Failed to find resource type"))
}

/// Find a resource type by name.
pub async fn find_by_name(conn: &mut PgConnection, name: &str) -> AppResult<Option<ResourceType>> {
    sqlx::query_as::<_, ResourceType>(
        "SELECT id, name, created_at FROM resource_types WHERE name = $1",
    )
    .bind(name)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| db_error(e, "Failed to find resource type"))
}

/// List all resource types.
pub async fn find_all(conn: &mut PgConnection) -> AppResult<Vec<ResourceType>> {
    sqlx::query_as::<_, ResourceType>("SELECT id, name, created_at FROM resource_types ORDER BY id")
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| db_error(e, "Failed to list resource types"))
}

/// Rename a resource type.
pub async fn rename(
    conn: &mut PgConnection,
    id: ResourceTypeId,
    name: &str,
) -> AppResult<Option<ResourceType>> {
    sqlx::query_as::<_, ResourceType>(
        "UPDATE resource_types SET name = $2 WHERE id = $1 RETURNING id, name, created_at",
    )
    .bind(id)
    .bind(name)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| db_error(e, "Failed to rename resource type"))
}

/// Delete a resource type.
pub async fn delete(conn: &mut PgConnection, id: ResourceTypeId) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM resource_types WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| db_error(e, "Failed to delete resource type"))?;
    Ok(result.rows_affected() > 0)
}
