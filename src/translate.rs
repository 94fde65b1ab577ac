//! Pure mapping between the internal message model and each vendor wire
//! format.
//!
//! Nothing here performs I/O. Request bodies, endpoints, and headers are
//! built from the `(role, content)` wire projection of messages plus a
//! [`ProviderConfig`], keyed by its [`RequestFormat`]. Custom formats
//! delegate to a transform registered in a [`TransformRegistry`] and looked
//! up by the identifier the config persists.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::types::{MessageRole, ProviderConfig, RequestFormat, RequestOptions, WireMessage};

/// Fallback `max_tokens` for anthropic-shaped requests.
const ANTHROPIC_DEFAULT_MAX_TOKENS: u32 = 4096;

/// A request-body transform for providers with `RequestFormat::Custom`.
///
/// Registered under an identifier at construction time; configs persist the
/// identifier, never the code.
pub trait RequestTransform: Send + Sync {
    /// Build the full request body for the given conversation.
    fn build(&self, messages: &[WireMessage], model: &str, options: &RequestOptions) -> Value;
}

impl<F> RequestTransform for F
where
    F: Fn(&[WireMessage], &str, &RequestOptions) -> Value + Send + Sync,
{
    fn build(&self, messages: &[WireMessage], model: &str, options: &RequestOptions) -> Value {
        self(messages, model, options)
    }
}

/// The strategy table resolving persisted transform identifiers.
#[derive(Clone, Default)]
pub struct TransformRegistry {
    transforms: HashMap<String, Arc<dyn RequestTransform>>,
}

impl TransformRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transform under an identifier, replacing any previous one.
    pub fn register(&mut self, id: impl Into<String>, transform: Arc<dyn RequestTransform>) {
        self.transforms.insert(id.into(), transform);
    }

    /// Resolve an identifier to its transform.
    pub fn get(&self, id: &str) -> Option<Arc<dyn RequestTransform>> {
        self.transforms.get(id).cloned()
    }
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&str> = self.transforms.keys().map(String::as_str).collect();
        ids.sort_unstable();
        f.debug_struct("TransformRegistry").field("ids", &ids).finish()
    }
}

fn wire_array(messages: &[WireMessage]) -> Value {
    Value::Array(
        messages
            .iter()
            .map(|m| json!({"role": m.role.as_str(), "content": m.content}))
            .collect(),
    )
}

fn openai_body(messages: &[WireMessage], model: &str, options: &RequestOptions) -> Value {
    let mut body = Map::new();
    body.insert("model".to_string(), json!(model));
    body.insert("stream".to_string(), json!(options.stream_or_default()));
    if let Some(temperature) = options.temperature {
        body.insert("temperature".to_string(), json!(temperature));
    }
    if let Some(max_tokens) = options.max_tokens {
        body.insert("max_tokens".to_string(), json!(max_tokens));
    }
    for (key, value) in &options.extra {
        body.insert(key.clone(), value.clone());
    }
    body.insert("messages".to_string(), wire_array(messages));
    Value::Object(body)
}

fn anthropic_body(messages: &[WireMessage], model: &str, options: &RequestOptions) -> Value {
    // The first system message is hoisted into the top-level system string;
    // any further system messages are dropped.
    let system = messages
        .iter()
        .find(|m| m.role == MessageRole::System)
        .map(|m| m.content.clone());
    let conversation: Vec<WireMessage> = messages
        .iter()
        .filter(|m| m.role != MessageRole::System)
        .cloned()
        .collect();

    let mut body = Map::new();
    body.insert("model".to_string(), json!(model));
    body.insert("messages".to_string(), wire_array(&conversation));
    if let Some(system) = system {
        body.insert("system".to_string(), json!(system));
    }
    body.insert(
        "max_tokens".to_string(),
        json!(options.max_tokens.unwrap_or(ANTHROPIC_DEFAULT_MAX_TOKENS)),
    );
    body.insert("stream".to_string(), json!(options.stream_or_default()));
    Value::Object(body)
}

fn google_body(messages: &[WireMessage], options: &RequestOptions) -> Value {
    // System messages pass through as "user" turns; the google format has no
    // hoisted system field here, matching the source behavior.
    let contents: Vec<Value> = messages
        .iter()
        .map(|m| {
            let role = if m.role == MessageRole::Assistant {
                "model"
            } else {
                "user"
            };
            json!({"role": role, "parts": [{"text": m.content}]})
        })
        .collect();

    let mut generation_config = Map::new();
    if let Some(temperature) = options.temperature {
        generation_config.insert("temperature".to_string(), json!(temperature));
    }
    if let Some(max_tokens) = options.max_tokens {
        generation_config.insert("maxOutputTokens".to_string(), json!(max_tokens));
    }

    json!({
        "contents": contents,
        "generationConfig": generation_config,
    })
}

/// Build the vendor request body for one completion request.
///
/// `transform` is the resolved custom strategy; it is consulted only for
/// [`RequestFormat::Custom`], which falls back to the openai shape when the
/// config names no registered transform.
pub fn build_request_body(
    format: RequestFormat,
    messages: &[WireMessage],
    model: &str,
    options: &RequestOptions,
    transform: Option<&dyn RequestTransform>,
) -> Value {
    match format {
        RequestFormat::Openai => openai_body(messages, model, options),
        RequestFormat::Anthropic => anthropic_body(messages, model, options),
        RequestFormat::Google => google_body(messages, options),
        RequestFormat::Custom => match transform {
            Some(transform) => transform.build(messages, model, options),
            None => openai_body(messages, model, options),
        },
    }
}

/// Build the endpoint URL for one completion request.
///
/// The google format carries the credential in the URL; every other format
/// posts to the chat-completions path.
pub fn build_endpoint(base_url: &str, model: &str, api_key: &str, format: RequestFormat) -> String {
    let base = base_url.trim_end_matches('/');
    match format {
        RequestFormat::Google => {
            format!("{base}/models/{model}:streamGenerateContent?key={api_key}")
        }
        _ => format!("{base}/chat/completions"),
    }
}

/// Build the request headers for a provider.
///
/// Starts from the config's base headers. A non-empty key is attached as
/// `x-api-key` for anthropic and as a bearer token otherwise; google never
/// carries the key in headers.
pub fn build_headers(config: &ProviderConfig) -> BTreeMap<String, String> {
    let mut headers = config.headers.clone();
    if !config.api_key.is_empty() && config.request_format != RequestFormat::Google {
        if config.request_format == RequestFormat::Anthropic {
            headers.insert("x-api-key".to_string(), config.api_key.clone());
        } else {
            headers.insert(
                "Authorization".to_string(),
                format!("Bearer {}", config.api_key),
            );
        }
    }
    headers
}
