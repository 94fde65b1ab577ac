use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::RequestFormat;
use crate::utils;

/// Default accent color for providers and projects.
pub(crate) const DEFAULT_COLOR: &str = "#6366f1";

/// Default model context window when a catalog entry does not say.
const DEFAULT_CONTEXT_WINDOW: u64 = 4096;

/// One model offered by a provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Vendor model identifier, e.g. `gpt-4o-mini`.
    pub id: String,

    /// Human-readable model name.
    pub name: String,

    /// Context window size in tokens.
    #[serde(default = "default_context_window")]
    pub context_window: u64,
}

fn default_context_window() -> u64 {
    DEFAULT_CONTEXT_WINDOW
}

impl ModelInfo {
    /// Create a new `ModelInfo`.
    pub fn new(id: impl Into<String>, name: impl Into<String>, context_window: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            context_window,
        }
    }
}

/// A validated description of one vendor endpoint and its wire format.
///
/// Configs are data only. Request building lives in [`crate::translate`] and
/// dispatch in [`crate::registry::ProviderRegistry`]; custom transforms are
/// persisted as identifiers and resolved against a registered strategy table
/// at dispatch time, never as stored code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Unique provider id.
    pub id: String,

    /// Display name.
    pub name: String,

    /// API base URL without a trailing path.
    pub base_url: String,

    /// Credential string passed through to the vendor.
    #[serde(default)]
    pub api_key: String,

    /// Whether [`ProviderConfig::validate`] insists on a non-empty key.
    #[serde(default = "default_true")]
    pub api_key_required: bool,

    /// Disabled providers are invisible to model aggregation and dispatch.
    #[serde(default)]
    pub enabled: bool,

    /// The models this provider offers, in display order.
    #[serde(default)]
    pub models: Vec<ModelInfo>,

    /// Id of the model used when a request names none. Must name an entry of
    /// `models` whenever `models` is non-empty.
    #[serde(default)]
    pub default_model: String,

    /// Base request headers; the credential header is added at build time.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// The wire convention this provider speaks.
    #[serde(default)]
    pub request_format: RequestFormat,

    /// Accent color for UI listings.
    #[serde(default = "default_color")]
    pub color: String,

    /// Identifier of a registered request transform, for `custom` format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_transform: Option<String>,

    /// Identifier of a registered response transform. Persisted for
    /// round-tripping; delta extraction currently uses the default shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_transform: Option<String>,

    /// Unix-millisecond creation time.
    pub created_at: i64,

    /// Unix-millisecond time of the last mutation.
    pub updated_at: i64,
}

fn default_true() -> bool {
    true
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

impl ProviderConfig {
    /// Create a provider config with a generated id and defaults.
    pub fn new(name: impl Into<String>) -> Self {
        let now = utils::time::now_ms();
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            id: utils::id::fresh("provider"),
            name: name.into(),
            base_url: String::new(),
            api_key: String::new(),
            api_key_required: true,
            enabled: false,
            models: Vec::new(),
            default_model: String::new(),
            headers,
            request_format: RequestFormat::Openai,
            color: DEFAULT_COLOR.to_string(),
            request_transform: None,
            response_transform: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the provider id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Sets whether an API key is required.
    pub fn with_api_key_required(mut self, required: bool) -> Self {
        self.api_key_required = required;
        self
    }

    /// Sets whether the provider is enabled.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the model list. The first model becomes the default when no
    /// default was chosen yet.
    pub fn with_models(mut self, models: Vec<ModelInfo>) -> Self {
        self.models = models;
        if self.default_model.is_empty() {
            if let Some(first) = self.models.first() {
                self.default_model = first.id.clone();
            }
        }
        self
    }

    /// Sets the default model id.
    pub fn with_default_model(mut self, default_model: impl Into<String>) -> Self {
        self.default_model = default_model.into();
        self
    }

    /// Adds a base request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the request format.
    pub fn with_request_format(mut self, request_format: RequestFormat) -> Self {
        self.request_format = request_format;
        self
    }

    /// Sets the accent color.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Sets the registered request transform id and switches to the custom
    /// format.
    pub fn with_request_transform(mut self, transform: impl Into<String>) -> Self {
        self.request_transform = Some(transform.into());
        self.request_format = RequestFormat::Custom;
        self
    }

    /// Check the config against the invariants enforced at add time.
    ///
    /// Never fails; every violated rule is reported, in check order.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("Provider name is required".to_string());
        }
        if self.base_url.trim().is_empty() {
            errors.push("Base URL is required".to_string());
        }
        if self.api_key_required && self.api_key.trim().is_empty() {
            errors.push("API key is required for this provider".to_string());
        }
        if self.models.is_empty() {
            errors.push("At least one model is required".to_string());
        }
        errors
    }

    /// Append a model. The first model added becomes the default.
    pub fn add_model(&mut self, model: ModelInfo) {
        self.models.push(model);
        if self.models.len() == 1 {
            self.default_model = self.models[0].id.clone();
        }
        self.updated_at = utils::time::now_ms();
    }

    /// Remove a model by id. When the default model is removed, the first
    /// remaining model becomes the default.
    pub fn remove_model(&mut self, model_id: &str) {
        self.models.retain(|m| m.id != model_id);
        if self.default_model == model_id {
            self.default_model = self
                .models
                .first()
                .map(|m| m.id.clone())
                .unwrap_or_default();
        }
        self.updated_at = utils::time::now_ms();
    }

    /// Update a model's name and/or context window. No-op when the id is
    /// unknown.
    pub fn update_model(&mut self, model_id: &str, name: Option<String>, context_window: Option<u64>) {
        if let Some(model) = self.models.iter_mut().find(|m| m.id == model_id) {
            if let Some(name) = name {
                model.name = name;
            }
            if let Some(context_window) = context_window {
                model.context_window = context_window;
            }
            self.updated_at = utils::time::now_ms();
        }
    }

    /// Apply a field-level patch, repair the default-model invariant, and
    /// refresh `updated_at`.
    pub fn apply(&mut self, update: ProviderUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(base_url) = update.base_url {
            self.base_url = base_url;
        }
        if let Some(api_key) = update.api_key {
            self.api_key = api_key;
        }
        if let Some(api_key_required) = update.api_key_required {
            self.api_key_required = api_key_required;
        }
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        if let Some(models) = update.models {
            self.models = models;
        }
        if let Some(default_model) = update.default_model {
            self.default_model = default_model;
        }
        if let Some(headers) = update.headers {
            self.headers = headers;
        }
        if let Some(request_format) = update.request_format {
            self.request_format = request_format;
        }
        if let Some(color) = update.color {
            self.color = color;
        }
        if let Some(request_transform) = update.request_transform {
            self.request_transform = request_transform;
        }
        if let Some(response_transform) = update.response_transform {
            self.response_transform = response_transform;
        }
        if !self.models.iter().any(|m| m.id == self.default_model) {
            self.default_model = self
                .models
                .first()
                .map(|m| m.id.clone())
                .unwrap_or_default();
        }
        self.updated_at = utils::time::now_ms();
    }
}

/// Field-level patch for a provider config.
///
/// Absent fields are left untouched. The transform fields are doubly
/// optional so a patch can clear them.
#[derive(Debug, Clone, Default)]
pub struct ProviderUpdate {
    /// Replacement display name.
    pub name: Option<String>,

    /// Replacement base URL.
    pub base_url: Option<String>,

    /// Replacement API key.
    pub api_key: Option<String>,

    /// Replacement key requirement.
    pub api_key_required: Option<bool>,

    /// Replacement enabled flag.
    pub enabled: Option<bool>,

    /// Replacement model list.
    pub models: Option<Vec<ModelInfo>>,

    /// Replacement default model id.
    pub default_model: Option<String>,

    /// Replacement header map.
    pub headers: Option<BTreeMap<String, String>>,

    /// Replacement request format.
    pub request_format: Option<RequestFormat>,

    /// Replacement accent color.
    pub color: Option<String>,

    /// Set (`Some(Some(_))`) or clear (`Some(None)`) the request transform.
    pub request_transform: Option<Option<String>>,

    /// Set or clear the response transform.
    pub response_transform: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_with_models() -> ProviderConfig {
        ProviderConfig::new("Acme")
            .with_base_url("https://api.acme.test/v1")
            .with_api_key("sk-test")
            .with_models(vec![
                ModelInfo::new("acme-small", "Acme Small", 8192),
                ModelInfo::new("acme-large", "Acme Large", 128_000),
            ])
    }

    #[test]
    fn validate_reports_every_violation() {
        let config = ProviderConfig::new("").with_base_url("");
        let errors = config.validate();
        assert_eq!(
            errors,
            vec![
                "Provider name is required",
                "Base URL is required",
                "API key is required for this provider",
                "At least one model is required",
            ]
        );
    }

    #[test]
    fn validate_accepts_keyless_provider() {
        let config = ProviderConfig::new("Local")
            .with_base_url("http://localhost:11434/v1")
            .with_api_key_required(false)
            .with_models(vec![ModelInfo::new("llama", "Llama", 8192)]);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn first_model_becomes_default() {
        let mut config = ProviderConfig::new("Acme");
        assert!(config.default_model.is_empty());
        config.add_model(ModelInfo::new("acme-small", "Acme Small", 8192));
        assert_eq!(config.default_model, "acme-small");
        config.add_model(ModelInfo::new("acme-large", "Acme Large", 128_000));
        assert_eq!(config.default_model, "acme-small");
    }

    #[test]
    fn removing_default_model_repairs_selection() {
        let mut config = provider_with_models();
        assert_eq!(config.default_model, "acme-small");
        config.remove_model("acme-small");
        assert_eq!(config.default_model, "acme-large");
        config.remove_model("acme-large");
        assert_eq!(config.default_model, "");
    }

    #[test]
    fn apply_repairs_stale_default_model() {
        let mut config = provider_with_models();
        config.apply(ProviderUpdate {
            models: Some(vec![ModelInfo::new("acme-xl", "Acme XL", 200_000)]),
            ..Default::default()
        });
        assert_eq!(config.default_model, "acme-xl");
    }

    #[test]
    fn apply_can_clear_transforms() {
        let mut config = provider_with_models().with_request_transform("legacy");
        assert_eq!(config.request_transform.as_deref(), Some("legacy"));
        config.apply(ProviderUpdate {
            request_transform: Some(None),
            ..Default::default()
        });
        assert!(config.request_transform.is_none());
    }

    #[test]
    fn persisted_shape_uses_camel_case() {
        let config = provider_with_models();
        let value = serde_json::to_value(&config).unwrap();
        assert!(value.get("baseUrl").is_some());
        assert!(value.get("apiKeyRequired").is_some());
        assert!(value.get("defaultModel").is_some());
        assert!(value.get("requestFormat").is_some());
        assert_eq!(value["models"][0]["contextWindow"], 8192);
    }
}
