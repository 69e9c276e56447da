//! Property codec.
//!
//! Turns untyped caller input into typed property values checked against
//! a resource type's declared property types, and into equality
//! predicates for looking resources up by property value.

use serde_json::Value;
use tracing::debug;

use resman_core::error::AppError;
use resman_core::result::AppResult;
use resman_core::types::{PropertyTypeId, ResourceId};
use resman_database::{PropertyPredicate, StoreTransaction};
use resman_entity::{Property, PropertyKind, PropertyType, PropertyValue};

/// Untyped property input keyed by property name.
pub type RawResourceProps = serde_json::Map<String, Value>;

/// A property value checked against its declared type, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedProperty {
    /// Declared type of the property.
    pub property_type_id: PropertyTypeId,
    /// Property name.
    pub name: String,
    /// Coerced value.
    pub value: PropertyValue,
}

/// Build a [`RawResourceProps`] from name/value pairs.
pub fn raw_props<I, K, V>(pairs: I) -> RawResourceProps
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Coerce a raw value to the kind declared by `property_type`.
///
/// Ints accept JSON integers and integral strings; strings accept JSON
/// strings only.
pub fn coerce_value(property_type: &PropertyType, raw: &Value) -> AppResult<PropertyValue> {
    let kind = property_type.kind().ok_or_else(|| {
        AppError::unsupported_property_type(format!(
            "Unsupported property type \"{}\"",
            property_type.value_type
        ))
    })?;

    let coerced = match (kind, raw) {
        (PropertyKind::Int, Value::Number(n)) => n.as_i64().map(PropertyValue::Int),
        (PropertyKind::Int, Value::String(s)) => s.trim().parse::<i64>().ok().map(PropertyValue::Int),
        (PropertyKind::String, Value::String(s)) => Some(PropertyValue::String(s.clone())),
        _ => None,
    };

    coerced.ok_or_else(|| {
        AppError::invalid_property_value(format!(
            "Value {raw} is not a valid {} for property \"{}\"",
            kind.as_str(),
            property_type.name
        ))
    })
}

/// Check raw values against every declared property type.
///
/// A mandatory property without a value fails the whole parse. An absent
/// optional property takes the declared default, or is omitted when there
/// is none. JSON `null` counts as absent. Names not declared on the
/// resource type are ignored.
pub fn parse_props(
    property_types: &[PropertyType],
    raw: &RawResourceProps,
) -> AppResult<Vec<ParsedProperty>> {
    let mut parsed = Vec::with_capacity(property_types.len());

    for pt in property_types {
        let value = match raw.get(&pt.name).filter(|v| !v.is_null()) {
            Some(raw_value) => coerce_value(pt, raw_value)?,
            None if pt.mandatory => {
                return Err(AppError::missing_mandatory_property(format!(
                    "Missing mandatory property \"{}\"",
                    pt.name
                )));
            }
            None => match &pt.default_value {
                // Defaults pass the same kind check as supplied values.
                Some(default) => coerce_value(pt, &Value::from(default.clone()))?,
                None => continue,
            },
        };

        parsed.push(ParsedProperty {
            property_type_id: pt.id,
            name: pt.name.clone(),
            value,
        });
    }

    let ignored = raw
        .keys()
        .filter(|name| !property_types.iter().any(|pt| &pt.name == *name))
        .count();
    if ignored > 0 {
        debug!(ignored, "Ignoring undeclared property names");
    }

    Ok(parsed)
}

/// Persist parsed properties onto a resource.
pub async fn persist_props(
    tx: &mut dyn StoreTransaction,
    resource_id: ResourceId,
    parsed: &[ParsedProperty],
) -> AppResult<Vec<Property>> {
    let mut props = Vec::with_capacity(parsed.len());
    for p in parsed {
        let prop = tx
            .create_property(resource_id, p.property_type_id, &p.value)
            .await
            .map_err(|e| e.context(format!("Unable to instantiate property \"{}\"", p.name)))?;
        props.push(prop);
    }
    Ok(props)
}

/// Build a conjunctive equality predicate from raw name/value pairs.
///
/// Each name must be declared on the resource type.
pub fn compare_props(
    property_types: &[PropertyType],
    raw: &RawResourceProps,
) -> AppResult<Vec<PropertyPredicate>> {
    raw.iter()
        .map(|(name, value)| {
            let pt = property_types
                .iter()
                .find(|pt| &pt.name == name)
                .ok_or_else(|| AppError::unknown_property(format!("Unknown property \"{name}\"")))?;
            Ok(PropertyPredicate::new(pt.id, coerce_value(pt, value)?))
        })
        .collect()
}

/// The raw form of a resource's properties, as accepted by the codec.
pub fn to_raw_props(properties: &[Property]) -> RawResourceProps {
    properties
        .iter()
        .map(|p| (p.name.clone(), Value::from(p.value.clone())))
        .collect()
}
