//! LLM Provider implementations for StemChat.
//!
//! All providers implement the `stemchat_core::Provider` trait.
//! [`build_from_config`] decides whether the assistant gets a provider at all:
//! no API key means no LLM, and the assistant answers from its rules alone.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use std::sync::Arc;
use std::time::Duration;
use stemchat_config::AppConfig;
use stemchat_core::provider::Provider;

/// Build the configured provider, or `None` when no API key is available.
pub fn build_from_config(config: &AppConfig) -> Option<Arc<dyn Provider>> {
    let api_key = config.api_key.as_deref().filter(|k| !k.trim().is_empty())?;

    let base_url = config
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(&config.provider));

    // The HTTP timeout sits a little above the assistant's own budget so the
    // assistant's timeout fires first and the fallback path is taken.
    let http_timeout = Duration::from_secs(config.llm.timeout_secs.saturating_add(5));

    tracing::debug!(provider = %config.provider, base_url = %base_url, "Building LLM provider");

    Some(Arc::new(
        OpenAiCompatProvider::new(&config.provider, base_url, api_key).with_timeout(http_timeout),
    ))
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => "https://api.openai.com/v1".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_api_key_means_no_provider() {
        let config = AppConfig::default();
        assert!(build_from_config(&config).is_none());
    }

    #[test]
    fn blank_api_key_means_no_provider() {
        let config: AppConfig = toml::from_str("api_key = \"\"").unwrap();
        assert!(build_from_config(&config).is_none());

        let config = AppConfig {
            api_key: Some("   ".into()),
            ..AppConfig::default()
        };
        assert!(build_from_config(&config).is_none());
    }

    #[test]
    fn api_key_builds_named_provider() {
        let config = AppConfig {
            api_key: Some("sk-test".into()),
            provider: "openrouter".into(),
            ..AppConfig::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "openrouter");
    }

    #[test]
    fn known_base_urls() {
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("ollama").contains("11434"));
        assert!(default_base_url("something-else").contains("api.openai.com"));
    }
}
