//! Property values and their stored form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

use resman_core::types::{PropertyId, PropertyTypeId, ResourceId};

/// Supported property kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    /// 64-bit signed integer.
    Int,
    /// UTF-8 text.
    String,
}

impl PropertyKind {
    /// Stored name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::String => "string",
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" => Ok(Self::Int),
            "string" => Ok(Self::String),
            other => Err(format!("unsupported property kind \"{other}\"")),
        }
    }
}

/// A typed property value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Integer value.
    Int(i64),
    /// String value.
    String(String),
}

impl PropertyValue {
    /// The kind this value belongs to.
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Int(_) => PropertyKind::Int,
            Self::String(_) => PropertyKind::String,
        }
    }

    /// The integer value, if this is an int.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::String(_) => None,
        }
    }

    /// The string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Int(_) => None,
            Self::String(v) => Some(v),
        }
    }

    /// Split into the `(int_val, string_val)` column pair.
    pub fn to_db_values(&self) -> (Option<i64>, Option<String>) {
        match self {
            Self::Int(v) => (Some(*v), None),
            Self::String(v) => (None, Some(v.clone())),
        }
    }

    /// Rebuild from the `(int_val, string_val)` column pair.
    pub fn from_db_values(int_val: Option<i64>, string_val: Option<String>) -> Option<Self> {
        match (int_val, string_val) {
            (Some(v), _) => Some(Self::Int(v)),
            (None, Some(v)) => Some(Self::String(v)),
            (None, None) => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<PropertyValue> for serde_json::Value {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::Int(v) => Self::from(v),
            PropertyValue::String(v) => Self::String(v),
        }
    }
}

/// A property value attached to a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Unique identifier.
    pub id: PropertyId,
    /// Owning resource.
    pub resource_id: ResourceId,
    /// Declaring property type.
    pub property_type_id: PropertyTypeId,
    /// Name of the declaring property type.
    pub name: String,
    /// The typed value.
    pub value: PropertyValue,
}

impl<'r> FromRow<'r, PgRow> for Property {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let int_val: Option<i64> = row.try_get("int_val")?;
        let string_val: Option<String> = row.try_get("string_val")?;
        let value = PropertyValue::from_db_values(int_val, string_val).ok_or_else(|| {
            sqlx::Error::ColumnDecode {
                index: "int_val".to_string(),
                source: "property row carries neither an int nor a string value".into(),
            }
        })?;
        Ok(Self {
            id: row.try_get("id")?,
            resource_id: row.try_get("resource_id")?,
            property_type_id: row.try_get("property_type_id")?,
            name: row.try_get("name")?,
            value,
        })
    }
}
