//! Field resolution - merges schema-derived field lists with configured
//! allow-lists and per-view overrides.
//!
//! Pure functions over explicit field lists. When no schema is available the
//! caller is responsible for deriving fields from a sample record before
//! handing them here.

use serde_json::Value;

use crate::config::FieldOverrides;

/// Wildcard token meaning "all fields not otherwise listed".
pub const WILDCARD: &str = "*";

/// The JSON Schema shapes the console actually consumes.
///
/// Anything else (scalars, arrays of scalars, missing schemas) is
/// `Unsupported` and contributes no fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaShape {
    /// `{ "type": "object", "properties": { ... } }`
    Object { fields: Vec<String> },
    /// `{ "type": "array", "items": { "properties": { ... } } }`
    ArrayOfObjects { fields: Vec<String> },
    Unsupported,
}

impl SchemaShape {
    /// Classify a schema value. Property names are kept in document order.
    pub fn of(schema: &Value) -> SchemaShape {
        if schema.get("type").and_then(Value::as_str) == Some("array") {
            if let Some(props) = schema
                .get("items")
                .and_then(|items| items.get("properties"))
                .and_then(Value::as_object)
            {
                return SchemaShape::ArrayOfObjects {
                    fields: props.keys().cloned().collect(),
                };
            }
            return SchemaShape::Unsupported;
        }
        if let Some(props) = schema.get("properties").and_then(Value::as_object) {
            return SchemaShape::Object {
                fields: props.keys().cloned().collect(),
            };
        }
        SchemaShape::Unsupported
    }

    /// Field names for this shape, empty when unsupported.
    pub fn fields(&self) -> &[String] {
        match self {
            SchemaShape::Object { fields } | SchemaShape::ArrayOfObjects { fields } => fields,
            SchemaShape::Unsupported => &[],
        }
    }

    /// The properties map of the consumed object schema, if any.
    fn properties<'a>(schema: &'a Value) -> Option<&'a Value> {
        if schema.get("type").and_then(Value::as_str) == Some("array") {
            schema.get("items")?.get("properties")
        } else {
            schema.get("properties")
        }
    }
}

/// Extract property names from a schema, in document order.
pub fn extract_schema_fields(schema: &Value) -> Vec<String> {
    match SchemaShape::of(schema) {
        SchemaShape::Object { fields } | SchemaShape::ArrayOfObjects { fields } => fields,
        SchemaShape::Unsupported => Vec::new(),
    }
}

/// Apply a configured display-field allow-list.
///
/// Absent or empty lists leave the schema fields unchanged. Otherwise the
/// listed fields appear in listed order; a wildcard appends the remaining
/// schema fields in their original order, and without one unlisted fields are
/// dropped.
pub fn apply_display_fields(schema_fields: &[String], display_fields: Option<&[String]>) -> Vec<String> {
    let Some(display_fields) = display_fields.filter(|list| !list.is_empty()) else {
        return schema_fields.to_vec();
    };

    let explicit: Vec<String> = display_fields
        .iter()
        .filter(|field| *field != WILDCARD)
        .cloned()
        .collect();
    if display_fields.iter().any(|field| field == WILDCARD) {
        let remaining = schema_fields
            .iter()
            .filter(|field| !explicit.contains(*field))
            .cloned();
        explicit.into_iter().chain(remaining).collect()
    } else {
        explicit
    }
}

/// Apply hide/order overrides to a resolved field list.
///
/// `labels` and `widgets` affect presentation only and never touch ordering
/// or inclusion.
pub fn apply_overrides(fields: &[String], overrides: Option<&FieldOverrides>) -> Vec<String> {
    let Some(overrides) = overrides else {
        return fields.to_vec();
    };

    let mut next: Vec<String> = match &overrides.hidden {
        Some(hidden) if !hidden.is_empty() => fields
            .iter()
            .filter(|field| !hidden.contains(*field))
            .cloned()
            .collect(),
        _ => fields.to_vec(),
    };

    if let Some(order) = overrides.order.as_deref().filter(|list| !list.is_empty()) {
        let named: Vec<&String> = order.iter().filter(|field| *field != WILDCARD).collect();
        let remaining: Vec<String> = next
            .iter()
            .filter(|field| !named.contains(field))
            .cloned()
            .collect();

        if order.iter().any(|field| field == WILDCARD) {
            let mut result = Vec::with_capacity(next.len());
            for field in order {
                if field == WILDCARD {
                    result.extend(remaining.iter().cloned());
                } else if next.contains(field) {
                    result.push(field.clone());
                }
            }
            next = result;
        } else {
            let mut result: Vec<String> = named
                .into_iter()
                .filter(|field| next.contains(*field))
                .cloned()
                .collect();
            result.extend(remaining);
            next = result;
        }
    }

    next
}

/// Full pipeline: allow-list, then overrides.
pub fn resolve_fields(
    schema_fields: &[String],
    display_fields: Option<&[String]>,
    overrides: Option<&FieldOverrides>,
) -> Vec<String> {
    let displayed = apply_display_fields(schema_fields, display_fields);
    apply_overrides(&displayed, overrides)
}

/// Display label for a field: configured label, else the schema property
/// `title`, else the field name itself.
pub fn field_label(field: &str, overrides: Option<&FieldOverrides>, schema: Option<&Value>) -> String {
    if let Some(label) = overrides
        .and_then(|o| o.labels.as_ref())
        .and_then(|labels| labels.get(field))
    {
        return label.clone();
    }
    if let Some(title) = schema
        .and_then(SchemaShape::properties)
        .and_then(|props| props.get(field))
        .and_then(|prop| prop.get("title"))
        .and_then(Value::as_str)
    {
        return title.to_string();
    }
    field.to_string()
}
