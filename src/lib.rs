//! OAS Console Core
//!
//! Renders an administrative CRUD surface from two declarative inputs: a
//! dereferenced OpenAPI document and a navigation/config document.
//!
//! Two subsystems carry the weight:
//!
//! - the **operation registry** reverse-engineers collection/resource
//!   semantics from raw API paths, with no per-endpoint configuration;
//! - the **auth session** manages the OAuth2/OIDC token lifecycle:
//!   discovery, interactive redirect login, silent renewal, coalesced
//!   refresh, persistence.
//!
//! Everything else — field resolution, navigation lookup, the request layer —
//! is a thin consumer of those two.
//!
//! # Example
//!
//! ```
//! use oas_console::{build_registry, resolve_fields};
//! use serde_json::json;
//!
//! let oas = json!({
//!     "paths": {
//!         "/pets": {
//!             "get": {
//!                 "responses": { "200": { "content": { "application/json": {
//!                     "schema": {
//!                         "type": "array",
//!                         "items": { "type": "object", "properties": {
//!                             "id": {}, "name": {}, "tag": {}
//!                         } }
//!                     }
//!                 } } } }
//!             }
//!         },
//!         "/pets/{petId}": { "get": {}, "delete": {} }
//!     }
//! });
//!
//! let registry = build_registry(&oas);
//! let collection = &registry.collections["/pets"];
//! assert_eq!(collection.resource_path.as_deref(), Some("/pets/{petId}"));
//! assert_eq!(registry.resources["/pets/{petId}"].id_param, "petId");
//!
//! let schema = collection.get.as_ref().unwrap().response_schema.as_ref().unwrap();
//! let fields = oas_console::extract_schema_fields(schema);
//! let display = vec!["name".to_string(), "*".to_string()];
//! assert_eq!(
//!     resolve_fields(&fields, Some(&display), None),
//!     vec!["name", "id", "tag"]
//! );
//! ```

mod auth;
mod config;
mod credential;
mod error;
mod fields;
mod loader;
mod navigation;
mod registry;
mod request;
mod routes;
mod store;

pub use auth::{
    credential_provider, AuthSession, LoginRequest, ProviderMetadata, RedirectConfig,
};
pub use config::{
    dev_bypass_enabled, CollectionConfig, ConsoleConfig, DevBypass, FieldOverrides, FormLayout,
    FormOverrides, FormStep, NavItem, SecurityConfig, SecurityType, DEV_BYPASS_ENV,
};
pub use credential::{AnonymousCredentials, Credential, CredentialProvider, DevBypassCredentials};
pub use error::{AuthError, ConfigError, LoadError, RequestError};
pub use fields::{
    apply_display_fields, apply_overrides, extract_schema_fields, field_label, resolve_fields,
    SchemaShape, WILDCARD,
};
pub use loader::{is_url, load_document, load_document_auto, load_document_str, load_document_url};
pub use navigation::{NavEntry, NavIndex};
pub use registry::{
    build_registry, CollectionEntry, Method, Operation, OperationParam, OperationRegistry,
    ParamLocation, ResourceEntry,
};
pub use request::{resolve_base_url, ApiClient};
pub use routes::{decode_collection_path, encode_collection_path, fill_template};
pub use store::{
    MemoryStore, PendingLogin, SessionStore, TokenState, EXPIRY_MARGIN, PENDING_LOGIN_TTL,
};
