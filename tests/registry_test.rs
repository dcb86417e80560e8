//! Integration tests for registry construction and field resolution.

use oas_console::{
    build_registry, extract_schema_fields, resolve_fields, ConsoleConfig, FieldOverrides, NavIndex,
    SchemaShape,
};
use serde_json::{json, Value};

fn petstore() -> Value {
    json!({
        "openapi": "3.0.0",
        "servers": [ { "url": "https://petstore.example.com/v1" } ],
        "paths": {
            "/pets": {
                "get": {
                    "parameters": [
                        { "name": "limit", "in": "query", "schema": { "type": "integer" } },
                        { "name": "x-trace", "in": "header" }
                    ],
                    "responses": { "200": { "content": { "application/json": {
                        "schema": {
                            "type": "array",
                            "items": { "type": "object", "properties": {
                                "id": {}, "name": {}, "tag": {}
                            } }
                        }
                    } } } }
                },
                "post": {
                    "requestBody": { "content": { "application/json": {
                        "schema": { "type": "object", "properties": { "name": {}, "tag": {} } }
                    } } }
                }
            },
            "/pets/{petId}": {
                "get": {
                    "responses": { "200": { "content": { "application/json": {
                        "schema": { "type": "object", "properties": {
                            "id": {}, "name": {}, "tag": {}
                        } }
                    } } } }
                },
                "put": {},
                "delete": {}
            },
            "/stores": {
                "post": {}
            },
            "/health": {
                "head": {}
            }
        }
    })
}

#[test]
fn petstore_classification() {
    let registry = build_registry(&petstore());

    let pets = &registry.collections["/pets"];
    assert!(pets.get.is_some());
    assert!(pets.post.is_some());
    assert_eq!(pets.resource_path.as_deref(), Some("/pets/{petId}"));

    let pet = &registry.resources["/pets/{petId}"];
    assert_eq!(pet.id_param, "petId");
    assert!(pet.get.is_some());
    assert!(pet.put.is_some());
    assert!(pet.delete.is_some());

    assert_eq!(registry.resource_by_collection["/pets"], "/pets/{petId}");
    assert_eq!(registry.resource_for("/pets").unwrap().path, "/pets/{petId}");

    // create-only collection is registered, but nothing links to it
    assert!(registry.collections["/stores"].get.is_none());
    assert!(registry.collections["/stores"].resource_path.is_none());

    // no get/post means no collection at all
    assert!(!registry.collections.contains_key("/health"));
}

#[test]
fn build_is_deterministic() {
    let oas = petstore();
    let first = serde_json::to_string(&build_registry(&oas)).unwrap();
    let second = serde_json::to_string(&build_registry(&oas)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn header_params_are_not_query_params() {
    let registry = build_registry(&petstore());
    let list = registry.collections["/pets"].get.as_ref().unwrap();
    assert_eq!(list.query_params.len(), 1);
    assert_eq!(list.query_params[0].name, "limit");
}

#[test]
fn deep_and_non_trailing_templates_are_rejected() {
    let oas = json!({
        "paths": {
            "/pets": { "get": {} },
            "/pets/{petId}/visits/{visitId}": { "get": {} },
            "/pets/{petId}/visits": { "get": {} },
            "/clinics/{clinicId}": { "get": {} }
        }
    });
    let registry = build_registry(&oas);

    // Only /pets survives; no resource path qualifies.
    assert_eq!(registry.collections.len(), 1);
    assert!(registry.resources.is_empty());
    assert!(registry.resource_by_collection.is_empty());
}

#[test]
fn first_matching_resource_wins() {
    // Two templated paths under the same collection; document order decides.
    let oas = json!({
        "paths": {
            "/pets": { "get": {} },
            "/pets/{petId}": { "get": {} },
            "/pets/{name}": { "get": {} }
        }
    });
    let registry = build_registry(&oas);

    assert_eq!(registry.resource_by_collection["/pets"], "/pets/{petId}");
    assert_eq!(
        registry.collections["/pets"].resource_path.as_deref(),
        Some("/pets/{petId}")
    );
}

#[test]
fn empty_and_malformed_documents_degrade_to_empty() {
    assert!(build_registry(&json!({})).is_empty());
    assert!(build_registry(&json!({ "paths": {} })).is_empty());
    assert!(build_registry(&json!([])).is_empty());
    assert!(build_registry(&json!("nonsense")).is_empty());
}

#[test]
fn fields_resolve_from_response_schema_through_overrides() {
    let registry = build_registry(&petstore());
    let schema = registry.collections["/pets"]
        .get
        .as_ref()
        .unwrap()
        .response_schema
        .as_ref()
        .unwrap();

    assert_eq!(
        SchemaShape::of(schema),
        SchemaShape::ArrayOfObjects {
            fields: vec!["id".into(), "name".into(), "tag".into()]
        }
    );

    let schema_fields = extract_schema_fields(schema);
    let display = vec!["name".to_string(), "*".to_string()];
    let overrides = FieldOverrides {
        hidden: Some(vec!["id".into()]),
        order: Some(vec!["tag".into(), "*".into()]),
        ..FieldOverrides::default()
    };

    assert_eq!(
        resolve_fields(&schema_fields, Some(&display), Some(&overrides)),
        vec!["tag", "name"]
    );
}

#[test]
fn nav_index_feeds_field_resolution() {
    let config: ConsoleConfig = serde_json::from_value(json!({
        "oas_source": "petstore.json",
        "navigation": [{
            "label": "Pets",
            "collection": {
                "path": "/pets",
                "display_fields": ["name", "*"],
                "list_overrides": { "hidden": ["tag"] }
            }
        }]
    }))
    .unwrap();
    config.validate().unwrap();

    let registry = build_registry(&petstore());
    let nav = NavIndex::build(&config.navigation);

    let schema = registry.collections["/pets"]
        .get
        .as_ref()
        .unwrap()
        .response_schema
        .as_ref()
        .unwrap();
    let fields = resolve_fields(
        &extract_schema_fields(schema),
        nav.display_fields("/pets"),
        nav.list_overrides("/pets"),
    );

    assert_eq!(fields, vec!["name", "id"]);
}
