//! Provider config ownership, selection, and request dispatch.
//!
//! The registry owns the set of [`ProviderConfig`]s and the active-provider
//! selection, persisting both through the storage port. Dispatch ties the
//! layers together: translate the conversation for the resolved provider,
//! issue the HTTP request, and hand the response body to the stream decoder.

use std::collections::BTreeMap;
use std::sync::Arc;

use reqwest::Client as ReqwestClient;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use url::Url;

use crate::catalog;
use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUESTS, CLIENT_REQUEST_ERRORS};
use crate::sse::{DeltaStream, decode_deltas};
use crate::storage::{ACTIVE_PROVIDER_KEY, PROVIDERS_STORE, Storage};
use crate::translate::{self, TransformRegistry};
use crate::types::{AggregatedModel, ProviderConfig, ProviderUpdate, RequestOptions, WireMessage};

/// Owns provider configs, the active selection, and request dispatch.
pub struct ProviderRegistry {
    providers: BTreeMap<String, ProviderConfig>,
    active_provider_id: Option<String>,
    storage: Arc<dyn Storage>,
    client: ReqwestClient,
    transforms: TransformRegistry,
}

impl ProviderRegistry {
    /// Create a registry backed by the given storage port.
    ///
    /// Call [`ProviderRegistry::init`] before use to load persisted configs.
    pub fn new(storage: Arc<dyn Storage>) -> Result<Self> {
        let client = ReqwestClient::builder().build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {e}"),
                Some(Box::new(e)),
            )
        })?;
        Ok(Self {
            providers: BTreeMap::new(),
            active_provider_id: None,
            storage,
            client,
            transforms: TransformRegistry::new(),
        })
    }

    /// Sets the strategy table for custom request transforms.
    pub fn with_transforms(mut self, transforms: TransformRegistry) -> Self {
        self.transforms = transforms;
        self
    }

    /// Load persisted configs and the active selection.
    ///
    /// An empty store is seeded with the default catalog, all entries
    /// disabled. When no active provider was persisted (or the persisted id
    /// no longer resolves), the first enabled provider in id order is
    /// selected and persisted; with no enabled provider the selection stays
    /// clear.
    pub async fn init(&mut self) -> Result<()> {
        let saved = self.storage.get_all(PROVIDERS_STORE).await?;

        if saved.is_empty() {
            for provider in catalog::default_providers() {
                self.storage
                    .put(PROVIDERS_STORE, serde_json::to_value(&provider)?)
                    .await?;
                self.providers.insert(provider.id.clone(), provider);
            }
        } else {
            for value in saved {
                let provider: ProviderConfig = serde_json::from_value(value)?;
                self.providers.insert(provider.id.clone(), provider);
            }
        }

        self.active_provider_id = self
            .storage
            .get_setting(ACTIVE_PROVIDER_KEY)
            .await?
            .as_ref()
            .and_then(Value::as_str)
            .filter(|id| self.providers.contains_key(*id))
            .map(String::from);

        if self.active_provider_id.is_none() {
            if let Some(enabled) = self.providers.values().find(|p| p.enabled) {
                let id = enabled.id.clone();
                self.storage
                    .set_setting(ACTIVE_PROVIDER_KEY, Value::String(id.clone()))
                    .await?;
                self.active_provider_id = Some(id);
            }
        }

        Ok(())
    }

    /// One provider by id.
    pub fn get(&self, id: &str) -> Option<&ProviderConfig> {
        self.providers.get(id)
    }

    /// Every provider, in id order.
    pub fn all(&self) -> Vec<&ProviderConfig> {
        self.providers.values().collect()
    }

    /// Every enabled provider, in id order.
    pub fn enabled(&self) -> Vec<&ProviderConfig> {
        self.providers.values().filter(|p| p.enabled).collect()
    }

    /// The active provider, if one is selected.
    pub fn active(&self) -> Option<&ProviderConfig> {
        self.active_provider_id
            .as_deref()
            .and_then(|id| self.providers.get(id))
    }

    /// The active provider id, if one is selected.
    pub fn active_provider_id(&self) -> Option<&str> {
        self.active_provider_id.as_deref()
    }

    /// Select the active provider and persist the choice.
    pub async fn set_active(&mut self, id: &str) -> Result<()> {
        if !self.providers.contains_key(id) {
            return Err(Error::not_found(
                "provider does not exist",
                Some("provider".to_string()),
                Some(id.to_string()),
            ));
        }
        self.storage
            .set_setting(ACTIVE_PROVIDER_KEY, Value::String(id.to_string()))
            .await?;
        self.active_provider_id = Some(id.to_string());
        Ok(())
    }

    /// Validate and add a provider config.
    ///
    /// Validation failures are returned before any mutation or persistence.
    pub async fn add(&mut self, provider: ProviderConfig) -> Result<ProviderConfig> {
        let errors = provider.validate();
        if !errors.is_empty() {
            return Err(Error::validation(errors));
        }
        self.storage
            .put(PROVIDERS_STORE, serde_json::to_value(&provider)?)
            .await?;
        self.providers.insert(provider.id.clone(), provider.clone());
        Ok(provider)
    }

    /// Apply a field-level patch to a provider and persist it.
    pub async fn update(&mut self, id: &str, update: ProviderUpdate) -> Result<ProviderConfig> {
        let provider = self.providers.get_mut(id).ok_or_else(|| {
            Error::not_found(
                "provider does not exist",
                Some("provider".to_string()),
                Some(id.to_string()),
            )
        })?;
        provider.apply(update);
        let provider = provider.clone();
        self.storage
            .put(PROVIDERS_STORE, serde_json::to_value(&provider)?)
            .await?;
        Ok(provider)
    }

    /// Remove a provider and repair the active selection.
    ///
    /// Deleting the active provider re-selects the first remaining enabled
    /// provider, or clears the selection when none remain.
    pub async fn delete(&mut self, id: &str) -> Result<()> {
        if !self.providers.contains_key(id) {
            return Err(Error::not_found(
                "provider does not exist",
                Some("provider".to_string()),
                Some(id.to_string()),
            ));
        }

        self.providers.remove(id);
        self.storage.delete(PROVIDERS_STORE, id).await?;

        if self.active_provider_id.as_deref() == Some(id) {
            match self.providers.values().find(|p| p.enabled) {
                Some(enabled) => {
                    let next = enabled.id.clone();
                    self.storage
                        .set_setting(ACTIVE_PROVIDER_KEY, Value::String(next.clone()))
                        .await?;
                    self.active_provider_id = Some(next);
                }
                None => {
                    self.storage
                        .set_setting(ACTIVE_PROVIDER_KEY, Value::Null)
                        .await?;
                    self.active_provider_id = None;
                }
            }
        }

        Ok(())
    }

    /// Flatten the models of every enabled provider, provider order then
    /// model order.
    pub fn all_models(&self) -> Vec<AggregatedModel> {
        let mut models = Vec::new();
        for provider in self.providers.values().filter(|p| p.enabled) {
            for model in &provider.models {
                models.push(AggregatedModel::new(provider, model));
            }
        }
        models
    }

    /// Resolve a model reference to its provider and bare model id.
    ///
    /// `full_id` splits at the first `/`: the prefix names the provider and
    /// the remainder (which may itself contain `/`) names the model. With no
    /// separator the whole string is a bare model id against the active
    /// provider.
    pub fn resolve_model(&self, full_id: &str) -> Result<(&ProviderConfig, String)> {
        match full_id.split_once('/') {
            Some((provider_id, model_id)) => {
                let provider = self.providers.get(provider_id).ok_or_else(|| {
                    Error::not_found(
                        "provider does not exist",
                        Some("provider".to_string()),
                        Some(provider_id.to_string()),
                    )
                })?;
                Ok((provider, model_id.to_string()))
            }
            None => {
                let provider = self.active().ok_or_else(|| {
                    Error::not_found("no active provider", Some("provider".to_string()), None)
                })?;
                Ok((provider, full_id.to_string()))
            }
        }
    }

    /// Send one completion request and return the decoded delta stream.
    ///
    /// The provider is validated before any I/O; a non-2xx response becomes
    /// [`Error::Upstream`] carrying the status and body.
    pub async fn send_chat(
        &self,
        full_model_id: &str,
        messages: &[WireMessage],
        options: &RequestOptions,
    ) -> Result<DeltaStream> {
        let (provider, model_id) = self.resolve_model(full_model_id)?;
        let model = if model_id.is_empty() {
            provider.default_model.clone()
        } else {
            model_id
        };

        let errors = provider.validate();
        if !errors.is_empty() {
            return Err(Error::validation(errors));
        }

        let transform = provider
            .request_transform
            .as_deref()
            .and_then(|id| self.transforms.get(id));
        let body = translate::build_request_body(
            provider.request_format,
            messages,
            &model,
            options,
            transform.as_deref(),
        );
        let endpoint = translate::build_endpoint(
            &provider.base_url,
            &model,
            &provider.api_key,
            provider.request_format,
        );
        let url = Url::parse(&endpoint)?;
        let headers = header_map(&translate::build_headers(provider))?;

        log::debug!(
            "dispatching chat completion to provider {} model {model}",
            provider.id
        );
        CLIENT_REQUESTS.click();

        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                if e.is_timeout() {
                    Error::timeout(format!("Request timed out: {e}"), None)
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
                }
            })?;

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            let status_code = response.status().as_u16();
            let body = response.text().await.map_err(|e| {
                Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                )
            })?;
            return Err(Error::upstream(status_code, body));
        }

        let format = provider.request_format;
        Ok(Box::pin(decode_deltas(response.bytes_stream(), format)))
    }
}

/// Convert built headers into a reqwest header map.
fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            Error::http_client(format!("Invalid header name {name}: {e}"), Some(Box::new(e)))
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            Error::http_client(format!("Invalid header value: {e}"), Some(Box::new(e)))
        })?;
        map.insert(name, value);
    }
    Ok(map)
}
