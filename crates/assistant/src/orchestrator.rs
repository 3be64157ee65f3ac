//! The assistant entry point: try the LLM, fall back to the rules.

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use stemchat_config::AppConfig;
use stemchat_core::error::{Error, ProviderError, Result};
use stemchat_core::message::{ChatTurn, Message};
use stemchat_core::provider::{Provider, ProviderRequest};
use stemchat_knowledge::{FeedLimits, KnowledgeAggregator, KnowledgeCache, StaticFacts};
use tracing::{debug, info, warn};

use crate::fallback::FallbackEngine;
use crate::prompt::build_system_prompt;
use crate::text::clean;

/// Why an answer came from the rules instead of the LLM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    NoProvider,
    Timeout,
    ProviderFailed,
    EmptyResponse,
}

/// Where a reply came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplySource {
    Llm { model: String },
    Fallback { reason: FallbackReason },
}

/// A normalized reply and its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub text: String,
    pub source: ReplySource,
}

/// Answers visitor messages.
///
/// With a provider configured, each message gets one completion call with a
/// system prompt built from the cached knowledge. Any failure, timeout or
/// empty completion is logged and answered by the [`FallbackEngine`]
/// instead; the only error a caller ever sees is a blank message.
pub struct Assistant {
    cache: Arc<KnowledgeCache>,
    fallback: FallbackEngine,
    organization_name: String,
    provider: Option<Arc<dyn Provider>>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    llm_timeout: Duration,
    max_context_turns: usize,
}

impl Assistant {
    /// An assistant without an LLM, answering from the rules alone.
    pub fn new(cache: Arc<KnowledgeCache>, organization_name: impl Into<String>) -> Self {
        let organization_name = organization_name.into();
        Self {
            fallback: FallbackEngine::new(Arc::clone(&cache), organization_name.clone()),
            cache,
            organization_name,
            provider: None,
            model: String::new(),
            temperature: 0.7,
            max_tokens: None,
            llm_timeout: Duration::from_secs(30),
            max_context_turns: 10,
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        self.provider = Some(provider);
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Budget for one completion call. The call is abandoned when it runs out.
    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    pub fn with_max_context_turns(mut self, turns: usize) -> Self {
        self.max_context_turns = turns;
        self
    }

    /// Wire the whole stack from configuration: fact sheet, data source,
    /// aggregator, cache and (when an API key is set) the provider.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let facts = match config.knowledge.facts_path.as_deref() {
            Some(path) => StaticFacts::load(Path::new(path))?,
            None => StaticFacts::default(),
        };

        let source =
            stemchat_knowledge::open_source(config.knowledge.database_url.as_deref()).await;
        let aggregator = KnowledgeAggregator::new(source, Arc::new(facts))
            .with_limits(FeedLimits {
                events: config.knowledge.events_limit,
                announcements: config.knowledge.announcements_limit,
                news: config.knowledge.news_limit,
            })
            .with_query_timeout(Duration::from_secs(config.knowledge.source_timeout_secs));
        let cache = KnowledgeCache::new(aggregator).with_ttl(Duration::from_secs(
            config.knowledge.ttl_minutes.saturating_mul(60),
        ));

        let mut assistant = Self::new(Arc::new(cache), config.organization_name.clone())
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens)
            .with_llm_timeout(Duration::from_secs(config.llm.timeout_secs))
            .with_max_context_turns(config.assistant.max_context_turns);

        match stemchat_providers::build_from_config(config) {
            Some(provider) => {
                info!(provider = provider.name(), model = %config.model, "LLM enabled");
                assistant = assistant.with_provider(provider, config.model.clone());
            }
            None => info!("No API key configured, answering from rules only"),
        }

        Ok(assistant)
    }

    pub fn has_llm(&self) -> bool {
        self.provider.is_some()
    }

    pub fn cache(&self) -> &Arc<KnowledgeCache> {
        &self.cache
    }

    pub fn fallback(&self) -> &FallbackEngine {
        &self.fallback
    }

    pub fn organization_name(&self) -> &str {
        &self.organization_name
    }

    /// Answer `message` in the light of the prior `context`.
    pub async fn reply(
        &self,
        message: &str,
        context: &[ChatTurn],
        language: Option<&str>,
    ) -> Result<String> {
        Ok(self.respond(message, context, language).await?.text)
    }

    /// Like [`reply`](Self::reply), also reporting where the answer came from.
    pub async fn respond(
        &self,
        message: &str,
        context: &[ChatTurn],
        language: Option<&str>,
    ) -> Result<Reply> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::InvalidInput("message must not be empty".into()));
        }

        let reason = match &self.provider {
            Some(provider) => match self.generate(provider.as_ref(), message, context, language).await
            {
                Ok(reply) => return Ok(reply),
                Err(reason) => reason,
            },
            None => FallbackReason::NoProvider,
        };

        let text = self.fallback.resolve(message).await;
        debug!(?reason, "Answered from fallback rules");
        Ok(Reply {
            text,
            source: ReplySource::Fallback { reason },
        })
    }

    async fn generate(
        &self,
        provider: &dyn Provider,
        message: &str,
        context: &[ChatTurn],
        language: Option<&str>,
    ) -> std::result::Result<Reply, FallbackReason> {
        let snapshot = self.cache.snapshot().await;
        let system_prompt = build_system_prompt(&self.organization_name, &snapshot, language);

        let turns = self.recent_turns(context);
        let mut messages = Vec::with_capacity(turns.len() + 2);
        messages.push(Message::system(system_prompt));
        messages.extend(turns.iter().map(|turn| turn.to_message()));
        messages.push(Message::user(message));

        let request = ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(
            provider = provider.name(),
            model = %self.model,
            context_turns = turns.len(),
            "Calling LLM"
        );

        let response = match tokio::time::timeout(self.llm_timeout, provider.complete(request)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(provider = provider.name(), error = %e, "LLM call failed, using fallback rules");
                return Err(match e {
                    ProviderError::EmptyResponse => FallbackReason::EmptyResponse,
                    ProviderError::Timeout(_) => FallbackReason::Timeout,
                    _ => FallbackReason::ProviderFailed,
                });
            }
            Err(_) => {
                warn!(
                    provider = provider.name(),
                    timeout_secs = self.llm_timeout.as_secs(),
                    "LLM call timed out, using fallback rules"
                );
                return Err(FallbackReason::Timeout);
            }
        };

        let text = clean(&response.message.content);
        if text.is_empty() {
            warn!(provider = provider.name(), "LLM returned no text, using fallback rules");
            return Err(FallbackReason::EmptyResponse);
        }

        let model = if response.model.is_empty() {
            self.model.clone()
        } else {
            response.model
        };
        Ok(Reply {
            text,
            source: ReplySource::Llm { model },
        })
    }

    /// The last `max_context_turns` turns that carry any text.
    fn recent_turns<'a>(&self, context: &'a [ChatTurn]) -> Vec<&'a ChatTurn> {
        let turns: Vec<&ChatTurn> = context
            .iter()
            .filter(|turn| !turn.content.trim().is_empty())
            .collect();
        let skip = turns.len().saturating_sub(self.max_context_turns);
        turns[skip..].to_vec()
    }
}
