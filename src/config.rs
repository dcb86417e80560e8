//! Console configuration: navigation tree, security settings, overrides.
//!
//! Mirrors the declarative config document the console is driven by. The
//! types deserialize with serde; [`ConsoleConfig::validate`] enforces the
//! cross-field rules that cannot be expressed structurally (oauth2 required
//! fields, collection-xor-children navigation nodes, dev-bypass gating).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;

/// Environment variable that opts a debug build into the dev auth bypass.
pub const DEV_BYPASS_ENV: &str = "OAS_CONSOLE_DEV_AUTH_BYPASS";

/// Top-level console configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Where the OpenAPI document comes from: a file path or an URL.
    pub oas_source: String,
    /// Explicit API base URL; overrides the OAS `servers[0].url` fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_config: Option<SecurityConfig>,
    pub navigation: Vec<NavItem>,
}

impl ConsoleConfig {
    /// Parse a config document from raw JSON.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Enforce the cross-field rules. Called once at load time, before any
    /// session or registry work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(security) = &self.security_config {
            security.validate()?;
        }
        for item in &self.navigation {
            item.validate()?;
        }
        Ok(())
    }
}

/// Security mode for outbound API calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityType {
    OAuth2,
    Bearer,
    None,
}

/// `security_config` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(rename = "type")]
    pub security_type: SecurityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Authorization-server base URL; discovery appends the well-known path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_bypass: Option<DevBypass>,
}

impl SecurityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security_type == SecurityType::OAuth2 {
            if self.client_id.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::MissingClientId);
            }
            if self.as_base_url.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::MissingAsBaseUrl);
            }
        }
        if self.dev_bypass.is_some() && !cfg!(debug_assertions) {
            return Err(ConfigError::DevBypassInRelease);
        }
        Ok(())
    }

    /// Space-joined scope string, defaulting to `openid profile`.
    pub fn scope(&self) -> String {
        match self.scopes.as_deref() {
            Some(scopes) if !scopes.is_empty() => scopes.join(" "),
            _ => "openid profile".to_string(),
        }
    }
}

/// Static credential shortcut for development builds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevBypass {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

/// True when the dev bypass is usable: debug build plus explicit env opt-in.
pub fn dev_bypass_enabled() -> bool {
    cfg!(debug_assertions)
        && std::env::var(DEV_BYPASS_ENV).map(|v| v == "true").unwrap_or(false)
}

/// Per-view field overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widgets: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Vec<String>>,
}

/// Form layout overrides, on top of the shared field overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<FormLayout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<FormStep>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_overrides: Option<FieldOverrides>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormLayout {
    Single,
    MultiStep,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormStep {
    pub id: String,
    pub title: String,
    pub fields: Vec<String>,
}

/// Binding of a navigation node to a collection path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_overrides: Option<FieldOverrides>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_overrides: Option<FormOverrides>,
}

/// One node of the navigation tree: either bound to a collection or a group
/// of children, never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavItem {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<CollectionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavItem>,
}

impl NavItem {
    fn validate(&self) -> Result<(), ConfigError> {
        let has_collection = self
            .collection
            .as_ref()
            .map_or(false, |c| !c.path.is_empty());
        let has_children = !self.children.is_empty();

        if !has_collection && !has_children {
            return Err(ConfigError::NavItemEmpty {
                label: self.label.clone(),
            });
        }
        if has_collection && has_children {
            return Err(ConfigError::NavItemConflict {
                label: self.label.clone(),
            });
        }
        for child in &self.children {
            child.validate()?;
        }
        Ok(())
    }
}
