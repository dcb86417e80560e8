//! Operation registry - derives collection/resource semantics from an
//! OpenAPI document.
//!
//! The builder takes a dereferenced OpenAPI document and classifies its paths
//! into collections (no path parameters; list/create) and resources (exactly
//! one trailing path parameter under a known collection; get/update/delete).
//! No per-endpoint CRUD configuration is required - the shapes are recovered
//! from the document alone.
//!
//! `build_registry` is total: malformed or empty input degrades to an empty
//! registry so an unusable path renders as "no operations available" rather
//! than crashing the console.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

/// HTTP methods the registry extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// OpenAPI path-item key for this method.
    pub fn key(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
            Method::Put => "put",
            Method::Delete => "delete",
        }
    }
}

/// Where a parameter is carried, per the OpenAPI `in` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParamLocation {
    /// Parse an OpenAPI `in` value. Unknown locations return `None` and the
    /// parameter is skipped.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "path" => Some(ParamLocation::Path),
            "query" => Some(ParamLocation::Query),
            "header" => Some(ParamLocation::Header),
            "cookie" => Some(ParamLocation::Cookie),
            _ => None,
        }
    }
}

/// A parameter attached to an operation. The schema is retained raw and not
/// interpreted here.
#[derive(Debug, Clone, Serialize)]
pub struct OperationParam {
    pub name: String,
    pub location: ParamLocation,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub schema: Value,
}

/// One extracted operation: request/response schemas plus query parameters.
#[derive(Debug, Clone, Serialize)]
pub struct Operation {
    pub method: Method,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
    pub query_params: Vec<OperationParam>,
}

/// A collection path: list (`get`) and/or create (`post`).
#[derive(Debug, Clone, Serialize)]
pub struct CollectionEntry {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    /// The linked single-resource path, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_path: Option<String>,
}

/// A resource path: single-item `get`/`put`/`delete` directly under a
/// collection, with exactly one trailing `{param}` segment.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceEntry {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    /// Name of the trailing path parameter, e.g. `petId` for `/pets/{petId}`.
    pub id_param: String,
}

/// Immutable lookup structure over a single OpenAPI document.
///
/// Built once per document; rebuilding replaces the whole value. Entries exist
/// only when at least one operation was extracted for them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OperationRegistry {
    pub collections: BTreeMap<String, CollectionEntry>,
    pub resources: BTreeMap<String, ResourceEntry>,
    pub resource_by_collection: BTreeMap<String, String>,
}

impl OperationRegistry {
    /// Look up the resource entry linked to a collection path.
    pub fn resource_for(&self, collection_path: &str) -> Option<&ResourceEntry> {
        let resource_path = self.resource_by_collection.get(collection_path)?;
        self.resources.get(resource_path)
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty() && self.resources.is_empty()
    }
}

/// Build an [`OperationRegistry`] from a dereferenced OpenAPI document.
///
/// Total and deterministic: repeated calls over the same document produce
/// structurally identical registries, and malformed input yields an empty
/// registry rather than an error.
pub fn build_registry(oas: &Value) -> OperationRegistry {
    let Some(paths) = oas.get("paths").and_then(Value::as_object) else {
        return OperationRegistry::default();
    };

    let mut registry = OperationRegistry::default();
    // Document order matters for resource linking; with preserve_order the
    // paths map iterates in declaration order.
    let mut item_paths: Vec<&str> = Vec::new();

    // Pass 1: collection-like paths (no templated segments).
    for (path, item) in paths {
        if path.contains('{') {
            item_paths.push(path.as_str());
            continue;
        }
        let entry = CollectionEntry {
            path: path.clone(),
            get: build_operation(Method::Get, item),
            post: build_operation(Method::Post, item),
            resource_path: None,
        };
        if entry.get.is_some() || entry.post.is_some() {
            registry.collections.insert(path.clone(), entry);
        }
    }

    // Pass 2: item-like paths, accepted only directly under a registered
    // collection with exactly one trailing {param}.
    for path in item_paths {
        let Some((collection_path, id_param)) = split_resource_path(path) else {
            continue;
        };
        if !registry.collections.contains_key(collection_path) {
            continue;
        }
        let item = &paths[path];
        let entry = ResourceEntry {
            path: path.to_string(),
            get: build_operation(Method::Get, item),
            put: build_operation(Method::Put, item),
            delete: build_operation(Method::Delete, item),
            id_param: id_param.to_string(),
        };
        if entry.get.is_some() || entry.put.is_some() || entry.delete.is_some() {
            registry.resources.insert(path.to_string(), entry);
        }
    }

    // Pass 3: link each collection to its first matching resource path in
    // document order. Further candidates are ignored but logged.
    for (path, _) in paths {
        let Some(entry) = registry.resources.get(path) else {
            continue;
        };
        let collection_path = parent_collection(path);
        match registry.resource_by_collection.get(collection_path) {
            None => {
                registry
                    .resource_by_collection
                    .insert(collection_path.to_string(), path.clone());
                if let Some(collection) = registry.collections.get_mut(collection_path) {
                    collection.resource_path = Some(path.clone());
                }
            }
            Some(linked) => {
                tracing::warn!(
                    collection = collection_path,
                    linked = linked.as_str(),
                    ignored = entry.path.as_str(),
                    "multiple resource paths match one collection; keeping the first"
                );
            }
        }
    }

    registry
}

/// Split a path into `(collection, id_param)` when it has the resource shape:
/// exactly one templated segment, in trailing position.
///
/// Returns `None` for multi-parameter paths or non-trailing templates.
fn split_resource_path(path: &str) -> Option<(&str, &str)> {
    let idx = path.rfind('/')?;
    let (collection, tail) = (&path[..idx], &path[idx + 1..]);
    let id_param = tail.strip_prefix('{')?.strip_suffix('}')?;
    if id_param.is_empty() || id_param.contains('/') {
        return None;
    }
    // Any earlier templated segment disqualifies the path.
    if collection.contains('{') || collection.is_empty() {
        return None;
    }
    Some((collection, id_param))
}

/// Collection prefix of a known-good resource path.
fn parent_collection(resource_path: &str) -> &str {
    let idx = resource_path.rfind('/').unwrap_or(0);
    &resource_path[..idx]
}

fn build_operation(method: Method, path_item: &Value) -> Option<Operation> {
    let operation = path_item.get(method.key())?;
    if !operation.is_object() {
        return None;
    }

    let request_schema = operation
        .get("requestBody")
        .and_then(|body| body.get("content"))
        .and_then(pick_json_schema);
    let response_schema = operation
        .get("responses")
        .and_then(|responses| responses.get("200"))
        .and_then(|ok| ok.get("content"))
        .and_then(pick_json_schema);

    Some(Operation {
        method,
        request_schema,
        response_schema,
        query_params: query_params(path_item, operation),
    })
}

/// Pick the schema of the first JSON-compatible media type.
///
/// Preference: exact `application/json`, then any `+json` structured suffix,
/// then the first media type in document order.
fn pick_json_schema(content: &Value) -> Option<Value> {
    let content = content.as_object()?;
    if let Some(schema) = media_schema(content, "application/json") {
        return Some(schema);
    }
    for (media_type, media) in content {
        if media_type.ends_with("+json") {
            if let Some(schema) = media.get("schema") {
                return Some(schema.clone());
            }
        }
    }
    content
        .values()
        .next()
        .and_then(|media| media.get("schema"))
        .cloned()
}

fn media_schema(content: &Map<String, Value>, media_type: &str) -> Option<Value> {
    content.get(media_type)?.get("schema").cloned()
}

/// Union of path-item-level and operation-level parameters filtered to query
/// location. Operation-level parameters override path-item parameters of the
/// same name.
fn query_params(path_item: &Value, operation: &Value) -> Vec<OperationParam> {
    let mut params: Vec<OperationParam> = Vec::new();
    for source in [path_item, operation] {
        let Some(list) = source.get("parameters").and_then(Value::as_array) else {
            continue;
        };
        for raw in list {
            let Some(param) = parse_param(raw) else {
                continue;
            };
            if param.location != ParamLocation::Query {
                continue;
            }
            if let Some(existing) = params.iter_mut().find(|p| p.name == param.name) {
                *existing = param;
            } else {
                params.push(param);
            }
        }
    }
    params
}

fn parse_param(raw: &Value) -> Option<OperationParam> {
    let name = raw.get("name")?.as_str()?;
    let location = ParamLocation::parse(raw.get("in")?.as_str()?)?;
    Some(OperationParam {
        name: name.to_string(),
        location,
        schema: raw.get("schema").cloned().unwrap_or(Value::Null),
    })
}
