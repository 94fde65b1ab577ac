use serde::{Deserialize, Serialize};

/// The wire convention a provider speaks.
///
/// The format selects how request bodies are built, where the credential
/// goes, and how streaming deltas are extracted.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestFormat {
    /// OpenAI-compatible chat completions. The default.
    #[default]
    Openai,

    /// Anthropic messages with a hoisted top-level system string.
    Anthropic,

    /// Google generative-language content format, key in the URL.
    Google,

    /// A registered custom transform; falls back to the openai shape.
    Custom,
}

impl RequestFormat {
    /// The lowercase wire name of the format.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestFormat::Openai => "openai",
            RequestFormat::Anthropic => "anthropic",
            RequestFormat::Google => "google",
            RequestFormat::Custom => "custom",
        }
    }
}

impl std::fmt::Display for RequestFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(RequestFormat::Openai),
            "anthropic" => Ok(RequestFormat::Anthropic),
            "google" => Ok(RequestFormat::Google),
            "custom" => Ok(RequestFormat::Custom),
            _ => Err(format!("unknown request format: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn serializes_lowercase() {
        assert_eq!(to_value(RequestFormat::Openai).unwrap(), json!("openai"));
        assert_eq!(
            to_value(RequestFormat::Anthropic).unwrap(),
            json!("anthropic")
        );
        assert_eq!(to_value(RequestFormat::Google).unwrap(), json!("google"));
        assert_eq!(to_value(RequestFormat::Custom).unwrap(), json!("custom"));
    }

    #[test]
    fn parses_from_str() {
        assert_eq!(
            "anthropic".parse::<RequestFormat>().unwrap(),
            RequestFormat::Anthropic
        );
        assert!("claude".parse::<RequestFormat>().is_err());
    }

    #[test]
    fn default_is_openai() {
        assert_eq!(RequestFormat::default(), RequestFormat::Openai);
    }
}
