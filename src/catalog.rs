//! The built-in provider catalog.
//!
//! Seeded into an empty providers store on first init. Every entry starts
//! disabled; the user supplies a key and enables what they use.

use crate::types::{ModelInfo, ProviderConfig, RequestFormat};

/// The default well-known providers, in seed order.
pub fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig::new("OpenAI")
            .with_id("openai")
            .with_base_url("https://api.openai.com/v1")
            .with_models(vec![
                ModelInfo::new("gpt-4o", "GPT-4o", 128_000),
                ModelInfo::new("gpt-4o-mini", "GPT-4o Mini", 128_000),
                ModelInfo::new("gpt-4-turbo", "GPT-4 Turbo", 128_000),
                ModelInfo::new("gpt-4", "GPT-4", 8_192),
                ModelInfo::new("gpt-3.5-turbo", "GPT-3.5 Turbo", 16_385),
            ])
            .with_default_model("gpt-4o-mini")
            .with_color("#10a37f"),
        ProviderConfig::new("Anthropic (Claude)")
            .with_id("anthropic")
            .with_base_url("https://api.anthropic.com/v1")
            .with_models(vec![
                ModelInfo::new("claude-sonnet-4-5-20250929", "Claude Sonnet 4.5", 200_000),
                ModelInfo::new("claude-3-5-sonnet-20241022", "Claude 3.5 Sonnet", 200_000),
                ModelInfo::new("claude-3-5-haiku-20241022", "Claude 3.5 Haiku", 200_000),
                ModelInfo::new("claude-3-opus-20240229", "Claude 3 Opus", 200_000),
                ModelInfo::new("claude-3-sonnet-20240229", "Claude 3 Sonnet", 200_000),
                ModelInfo::new("claude-3-haiku-20240307", "Claude 3 Haiku", 200_000),
            ])
            .with_default_model("claude-sonnet-4-5-20250929")
            .with_header("anthropic-version", "2023-06-01")
            .with_request_format(RequestFormat::Anthropic)
            .with_color("#d97757"),
        ProviderConfig::new("Google (Gemini)")
            .with_id("google")
            .with_base_url("https://generativelanguage.googleapis.com/v1beta")
            .with_models(vec![
                ModelInfo::new("gemini-2.0-flash-exp", "Gemini 2.0 Flash Experimental", 1_000_000),
                ModelInfo::new("gemini-exp-1206", "Gemini Exp 1206", 2_000_000),
                ModelInfo::new("gemini-1.5-pro-latest", "Gemini 1.5 Pro", 2_000_000),
                ModelInfo::new("gemini-1.5-flash-latest", "Gemini 1.5 Flash", 1_000_000),
                ModelInfo::new("gemini-pro", "Gemini Pro", 32_760),
            ])
            .with_default_model("gemini-2.0-flash-exp")
            .with_request_format(RequestFormat::Google)
            .with_color("#4285f4"),
        ProviderConfig::new("DeepSeek")
            .with_id("deepseek")
            .with_base_url("https://api.deepseek.com/v1")
            .with_models(vec![
                ModelInfo::new("deepseek-chat", "DeepSeek Chat", 32_768),
                ModelInfo::new("deepseek-coder", "DeepSeek Coder", 16_384),
            ])
            .with_default_model("deepseek-chat")
            .with_color("#00d4aa"),
        ProviderConfig::new("Groq")
            .with_id("groq")
            .with_base_url("https://api.groq.com/openai/v1")
            .with_models(vec![
                ModelInfo::new("llama-3.3-70b-versatile", "Llama 3.3 70B", 128_000),
                ModelInfo::new("llama-3.1-70b-versatile", "Llama 3.1 70B", 128_000),
                ModelInfo::new("llama-3.1-8b-instant", "Llama 3.1 8B", 128_000),
                ModelInfo::new("mixtral-8x7b-32768", "Mixtral 8x7B", 32_768),
                ModelInfo::new("gemma2-9b-it", "Gemma 2 9B", 8_192),
            ])
            .with_default_model("llama-3.3-70b-versatile")
            .with_color("#f55036"),
        ProviderConfig::new("OpenRouter")
            .with_id("openrouter")
            .with_base_url("https://openrouter.ai/api/v1")
            .with_models(vec![
                ModelInfo::new("anthropic/claude-sonnet-4-5", "Claude Sonnet 4.5", 200_000),
                ModelInfo::new("anthropic/claude-3.5-sonnet", "Claude 3.5 Sonnet", 200_000),
                ModelInfo::new("openai/gpt-4o", "GPT-4o", 128_000),
                ModelInfo::new("openai/gpt-4o-mini", "GPT-4o Mini", 128_000),
                ModelInfo::new("google/gemini-2.0-flash-exp:free", "Gemini 2.0 Flash (Free)", 1_000_000),
                ModelInfo::new("google/gemini-pro-1.5", "Gemini Pro 1.5", 2_000_000),
                ModelInfo::new("meta-llama/llama-3.3-70b-instruct", "Llama 3.3 70B", 128_000),
                ModelInfo::new("qwen/qwen-2.5-72b-instruct", "Qwen 2.5 72B", 32_768),
                ModelInfo::new("deepseek/deepseek-chat", "DeepSeek Chat", 32_768),
            ])
            .with_default_model("anthropic/claude-sonnet-4-5")
            .with_color("#7c3aed"),
        ProviderConfig::new("xAI (Grok)")
            .with_id("xai")
            .with_base_url("https://api.x.ai/v1")
            .with_models(vec![
                ModelInfo::new("grok-beta", "Grok Beta", 131_072),
                ModelInfo::new("grok-vision-beta", "Grok Vision Beta", 8_192),
            ])
            .with_default_model("grok-beta")
            .with_color("#000000"),
        ProviderConfig::new("Mistral AI")
            .with_id("mistral")
            .with_base_url("https://api.mistral.ai/v1")
            .with_models(vec![
                ModelInfo::new("mistral-large-latest", "Mistral Large", 128_000),
                ModelInfo::new("mistral-medium-latest", "Mistral Medium", 32_000),
                ModelInfo::new("mistral-small-latest", "Mistral Small", 32_000),
                ModelInfo::new("open-mistral-7b", "Open Mistral 7B", 32_000),
            ])
            .with_default_model("mistral-large-latest")
            .with_color("#ff7000"),
        ProviderConfig::new("Perplexity")
            .with_id("perplexity")
            .with_base_url("https://api.perplexity.ai")
            .with_models(vec![
                ModelInfo::new("llama-3.1-sonar-large-128k-online", "Sonar Large Online", 127_072),
                ModelInfo::new("llama-3.1-sonar-small-128k-online", "Sonar Small Online", 127_072),
                ModelInfo::new("llama-3.1-sonar-large-128k-chat", "Sonar Large Chat", 127_072),
                ModelInfo::new("llama-3.1-sonar-small-128k-chat", "Sonar Small Chat", 127_072),
            ])
            .with_default_model("llama-3.1-sonar-large-128k-online")
            .with_color("#20808d"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_entry_is_disabled_and_keyed() {
        for provider in default_providers() {
            assert!(!provider.enabled, "{} must seed disabled", provider.id);
            assert!(provider.api_key_required);
            assert!(provider.api_key.is_empty());
        }
    }

    #[test]
    fn every_default_model_names_a_listed_model() {
        for provider in default_providers() {
            assert!(
                provider.models.iter().any(|m| m.id == provider.default_model),
                "{} default model must exist",
                provider.id
            );
        }
    }

    #[test]
    fn only_keyless_validation_errors_remain() {
        // Catalog entries are complete except for the user-supplied key.
        for provider in default_providers() {
            assert_eq!(
                provider.validate(),
                vec!["API key is required for this provider"],
                "{}",
                provider.id
            );
        }
    }

    #[test]
    fn ids_are_unique() {
        let providers = default_providers();
        let mut ids: Vec<&str> = providers.iter().map(|p| p.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), providers.len());
    }

    #[test]
    fn anthropic_carries_its_version_header() {
        let providers = default_providers();
        let anthropic = providers.iter().find(|p| p.id == "anthropic").unwrap();
        assert_eq!(
            anthropic.headers.get("anthropic-version").map(String::as_str),
            Some("2023-06-01")
        );
        assert_eq!(anthropic.request_format, RequestFormat::Anthropic);
    }
}
