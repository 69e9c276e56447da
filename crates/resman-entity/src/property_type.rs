//! Property type entity.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use validator::Validate;

use resman_core::types::{PropertyTypeId, ResourceTypeId};

use crate::property::{PropertyKind, PropertyValue};

/// A named, typed attribute declared on a resource type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyType {
    /// Unique identifier.
    pub id: PropertyTypeId,
    /// Owning resource type.
    pub resource_type_id: ResourceTypeId,
    /// Name, unique within the resource type.
    pub name: String,
    /// Declared value kind as stored (`"int"`, `"string"`).
    pub value_type: String,
    /// Whether every resource of the type must carry a value.
    pub mandatory: bool,
    /// Value used when an optional property is not supplied.
    pub default_value: Option<PropertyValue>,
}

impl PropertyType {
    /// The declared kind, or `None` if the stored kind is not supported.
    pub fn kind(&self) -> Option<PropertyKind> {
        self.value_type.parse().ok()
    }
}

impl<'r> FromRow<'r, PgRow> for PropertyType {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let int_val: Option<i64> = row.try_get("int_val")?;
        let string_val: Option<String> = row.try_get("string_val")?;
        Ok(Self {
            id: row.try_get("id")?,
            resource_type_id: row.try_get("resource_type_id")?,
            name: row.try_get("name")?,
            value_type: row.try_get("value_type")?,
            mandatory: row.try_get("mandatory")?,
            default_value: PropertyValue::from_db_values(int_val, string_val),
        })
    }
}

/// Input for declaring a property type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewPropertyType {
    /// Property name.
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Declared kind (`"int"` or `"string"`).
    #[validate(length(min = 1, max = 32))]
    pub value_type: String,
    /// Whether the property is mandatory.
    #[serde(default)]
    pub mandatory: bool,
    /// Optional default/init value.
    #[serde(default)]
    pub default_value: Option<PropertyValue>,
}

impl NewPropertyType {
    /// A mandatory property of the given kind without a default.
    pub fn mandatory(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            value_type: kind.as_str().to_string(),
            mandatory: true,
            default_value: None,
        }
    }

    /// An optional property of the given kind without a default.
    pub fn optional(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            value_type: kind.as_str().to_string(),
            mandatory: false,
            default_value: None,
        }
    }

    /// Set the default/init value.
    pub fn with_default(mut self, value: PropertyValue) -> Self {
        self.default_value = Some(value);
        self
    }
}
