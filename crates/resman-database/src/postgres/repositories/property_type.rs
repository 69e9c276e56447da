//! Property type queries.

use sqlx::PgConnection;

use resman_core::result::AppResult;
use resman_core::types::{PropertyTypeId, ResourceTypeId};
use resman_entity::{NewPropertyType, PropertyType};

use crate::postgres::error::db_error;

const COLUMNS: &str = "id, resource_type_id, name, value_type, mandatory, int_val, string_val";

/// Insert a property type.
pub async fn create(
    conn: &mut PgConnection,
    resource_type_id: ResourceTypeId,
    input: &NewPropertyType,
) -> AppResult<PropertyType> {
    let (int_val, string_val) = split_default(input);
    sqlx::query_as::<_, PropertyType>(&format!(
        "INSERT INTO property_types (resource_type_id, name, value_type, mandatory, int_val, string_val) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {COLUMNS}"
    ))
    .bind(resource_type_id)
    .bind(&input.name)
    .bind(&input.value_type)
    .bind(input.mandatory)
    .bind(int_val)
    .bind(string_val)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| db_error(e, "Failed to create property type"))
}

/// Find a property type by ID.
pub async fn find_by_id(
    conn: &mut PgConnection,
    id: PropertyTypeId,
) -> AppResult<Option<PropertyType>> {
    sqlx::query_as::<_, PropertyType>(&format!(
        "SELECT {COLUMNS} FROM property_types WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| db_error(e, "Failed to find property type"))
}

/// All property types of a resource type.
pub async fn find_by_resource_type(
    conn: &mut PgConnection,
    resource_type_id: ResourceTypeId,
) -> AppResult<Vec<PropertyType>> {
    sqlx::query_as::<_, PropertyType>(&format!(
        "SELECT {COLUMNS} FROM property_types WHERE resource_type_id = $1 ORDER BY id"
    ))
    .bind(resource_type_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| db_error(e, "Failed to list property types"))
}

/// Overwrite a property type's declaration.
pub async fn update(
    conn: &mut PgConnection,
    id: PropertyTypeId,
    input: &NewPropertyType,
) -> AppResult<Option<PropertyType>> {
    let (int_val, string_val) = split_default(input);
    sqlx::query_as::<_, PropertyType>(&format!(
        "UPDATE property_types SET name = $2, value_type = $3, mandatory = $4, int_val = $5, string_val = $6 \
         WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(&input.name)
    .bind(&input.value_type)
    .bind(input.mandatory)
    .bind(int_val)
    .bind(string_val)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| db_error(e, "Failed to update property type"))
}

/// Delete a property type.
pub async fn delete(conn: &mut PgConnection, id: PropertyTypeId) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM property_types WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| db_error(e, "Failed to delete property type"))?;
    Ok(result.rows_affected() > 0)
}

/// Number of property values referencing a property type.
pub async fn count_properties(conn: &mut PgConnection, id: PropertyTypeId) -> AppResult<u64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM properties WHERE property_type_id = $1")
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| db_error(e, "Failed to count properties"))?;
    Ok(count as u64)
}

fn split_default(input: &NewPropertyType) -> (Option<i64>, Option<String>) {
    input
        .default_value
        .as_ref()
        .map(|v| v.to_db_values())
        .unwrap_or((None, None))
}
