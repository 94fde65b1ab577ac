use serde_json::{Map, Value};

/// Per-request sampling and transport knobs.
///
/// For openai-shaped bodies the `extra` map is spliced into the request
/// verbatim, so vendor-specific fields pass through untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// Whether to request a streamed response. Defaults to true when unset.
    pub stream: Option<bool>,

    /// Sampling temperature.
    pub temperature: Option<f64>,

    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,

    /// Additional vendor-specific fields.
    pub extra: Map<String, Value>,
}

impl RequestOptions {
    /// Creates empty options: streaming on, everything else unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to stream the response.
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Adds a vendor-specific field passed through verbatim.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Whether streaming is requested, defaulting to true.
    pub fn stream_or_default(&self) -> bool {
        self.stream.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_pattern() {
        let options = RequestOptions::new()
            .with_stream(false)
            .with_temperature(0.2)
            .with_max_tokens(1024)
            .with_extra("top_p", json!(0.9));

        assert_eq!(options.stream, Some(false));
        assert_eq!(options.temperature, Some(0.2));
        assert_eq!(options.max_tokens, Some(1024));
        assert_eq!(options.extra.get("top_p"), Some(&json!(0.9)));
    }

    #[test]
    fn stream_defaults_on() {
        assert!(RequestOptions::new().stream_or_default());
        assert!(!RequestOptions::new().with_stream(false).stream_or_default());
    }
}
