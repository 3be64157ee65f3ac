//! Configuration loading, validation, and management for StemChat.
//!
//! Loads configuration from `~/.stemchat/config.toml` with environment
//! variable overrides. Validates all settings at startup. Every setting is
//! optional; a missing file yields the documented defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.stemchat/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// LLM API key. Its presence switches LLM generation on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// LLM provider name (selects the default base URL)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Override for the provider's base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Model identifier sent to the provider
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max output tokens per generated reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Display name of the organization the assistant speaks for
    #[serde(default = "default_organization_name")]
    pub organization_name: String,

    /// LLM call settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Knowledge aggregation and caching
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Conversation handling
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// HTTP adapter
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    500
}
fn default_organization_name() -> String {
    "STEMpower".into()
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("organization_name", &self.organization_name)
            .field("llm", &self.llm)
            .field("knowledge", &self.knowledge)
            .field("assistant", &self.assistant)
            .field("gateway", &self.gateway)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Upper bound on a single generation call; the assistant falls back
    /// to rule-based answers when it is exceeded.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_timeout() -> u64 {
    30
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_llm_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// How long an aggregated snapshot stays fresh
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: u64,

    /// Per-query bound on each data source call
    #[serde(default = "default_source_timeout")]
    pub source_timeout_secs: u64,

    #[serde(default = "default_feed_limit")]
    pub events_limit: usize,

    #[serde(default = "default_feed_limit")]
    pub announcements_limit: usize,

    #[serde(default = "default_feed_limit")]
    pub news_limit: usize,

    /// SQLite URL of the website database (e.g. `sqlite://data/site.db`).
    /// Without it the assistant runs on static facts only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    /// Optional TOML file overriding the built-in static fact sheet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facts_path: Option<String>,
}

fn default_ttl_minutes() -> u64 {
    30
}
fn default_source_timeout() -> u64 {
    10
}
fn default_feed_limit() -> usize {
    5
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_ttl_minutes(),
            source_timeout_secs: default_source_timeout(),
            events_limit: default_feed_limit(),
            announcements_limit: default_feed_limit(),
            news_limit: default_feed_limit(),
            database_url: None,
            facts_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// How many prior turns are forwarded to the LLM
    #[serde(default = "default_max_context_turns")]
    pub max_context_turns: usize,
}

fn default_max_context_turns() -> usize {
    10
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            max_context_turns: default_max_context_turns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Origins allowed to call the chat endpoint from a browser
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Key rate limits by the first `X-Forwarded-For` hop. Only enable this
    /// behind a reverse proxy that sets the header.
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

fn default_port() -> u16 {
    8787
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origins: vec![],
            trust_forwarded_for: false,
        }
    }
}

impl AppConfig {
    /// The default config file, `~/.stemchat/config.toml`.
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load `path`, then let the environment override the file:
    /// - `STEMCHAT_API_KEY`, then `OPENAI_API_KEY`, then `OPENROUTER_API_KEY`
    /// - `STEMCHAT_MODEL`
    /// - `STEMCHAT_ORG_NAME`
    /// - `STEMCHAT_MAX_TOKENS`
    /// - `STEMCHAT_DATABASE_URL`
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        // `api_key = ""` in the file means no key.
        config.api_key = config.api_key.take().filter(|k| !k.trim().is_empty());
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using the given lookup.
    ///
    /// Blank values are ignored so an exported-but-empty variable does not
    /// switch the LLM on with an empty key.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if !self.has_api_key() {
            self.api_key = get("STEMCHAT_API_KEY")
                .or_else(|| get("OPENAI_API_KEY"))
                .or_else(|| get("OPENROUTER_API_KEY"));
        }

        if let Some(model) = get("STEMCHAT_MODEL") {
            self.model = model;
        }

        if let Some(name) = get("STEMCHAT_ORG_NAME") {
            self.organization_name = name;
        }

        if let Some(max_tokens) = get("STEMCHAT_MAX_TOKENS") {
            match max_tokens.trim().parse::<u32>() {
                Ok(n) => self.max_tokens = n,
                Err(_) => tracing::warn!(
                    value = %max_tokens,
                    "Ignoring non-numeric STEMCHAT_MAX_TOKENS"
                ),
            }
        }

        if let Some(url) = get("STEMCHAT_DATABASE_URL") {
            self.knowledge.database_url = Some(url);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".stemchat")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "max_tokens must be > 0".into(),
            ));
        }

        if self.knowledge.ttl_minutes == 0 {
            return Err(ConfigError::ValidationError(
                "knowledge.ttl_minutes must be > 0".into(),
            ));
        }

        if self.llm.timeout_secs == 0 || self.knowledge.source_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeouts must be > 0 seconds".into(),
            ));
        }

        let limits = [
            self.knowledge.events_limit,
            self.knowledge.announcements_limit,
            self.knowledge.news_limit,
        ];
        if limits.contains(&0) {
            return Err(ConfigError::ValidationError(
                "knowledge feed limits must be > 0".into(),
            ));
        }

        if self.organization_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "organization_name must not be blank".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            api_url: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            organization_name: default_organization_name(),
            llm: LlmConfig::default(),
            knowledge: KnowledgeConfig::default(),
            assistant: AssistantConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
