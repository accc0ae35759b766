//! # LLM Client
//!
//! Provides the `Client` struct, the entry point for LLM interactions.
//! It resolves the configured provider and credentials and routes each request.

use crate::domain::config::AppConfig;
use crate::domain::traits::LlmProvider;
use crate::infrastructure::llm::providers;
use crate::infrastructure::llm::{Context, Error, Provider, Response};
use async_trait::async_trait;

/// Simple LLM client
pub struct Client {
    app_config: AppConfig,
}

impl Client {
    /// Create a new client from application configuration
    pub fn new(app_config: AppConfig) -> Self {
        Self { app_config }
    }

    /// Send a request context to the configured agent.
    ///
    /// The model from the agent config is used unless the context overrides it.
    pub async fn chat(&self, context: Context) -> Result<Response, Error> {
        let agent = &self.app_config.agent;

        let provider_type = Provider::from_str(&agent.provider)
            .ok_or_else(|| Error::new(&agent.provider, "Unknown provider"))?;

        let provider_config = providers::ProviderConfig::from_app_config(&self.app_config)?;

        tracing::debug!(
            "LLM request: provider={} model={} messages={}",
            provider_type.as_str(),
            context.model.as_deref().unwrap_or(&provider_config.default_model),
            context.messages.len()
        );

        let response = providers::chat(provider_type, provider_config, context).await?;
        tracing::debug!(
            "LLM response: model={} tokens={} (prompt {}, completion {})",
            response.model,
            response.usage.total_tokens,
            response.usage.prompt_tokens,
            response.usage.completion_tokens
        );
        Ok(response)
    }
}

#[async_trait]
impl LlmProvider for Client {
    async fn completion(&self, context: Context) -> Result<String, String> {
        self.chat(context)
            .await
            .map(|r| r.content)
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_str() {
        assert_eq!(Provider::from_str("gemini"), Some(Provider::Gemini));
        assert_eq!(Provider::from_str("Google"), Some(Provider::Gemini));
        assert_eq!(Provider::from_str("openai"), Some(Provider::OpenAI));
        assert_eq!(Provider::from_str("groq"), Some(Provider::Groq));
        assert_eq!(Provider::from_str("xai"), Some(Provider::XAI));
        assert_eq!(Provider::from_str("grok"), Some(Provider::XAI));
        assert_eq!(Provider::from_str("unknown"), None);
    }

    #[test]
    fn test_provider_as_str() {
        assert_eq!(Provider::Gemini.as_str(), "gemini");
        assert_eq!(Provider::OpenAI.as_str(), "openai");
        assert_eq!(Provider::Groq.as_str(), "groq");
        assert_eq!(Provider::XAI.as_str(), "xai");
    }

    #[tokio::test]
    async fn test_unknown_provider_is_an_error() {
        let mut config = AppConfig::default();
        config.agent.provider = "carrier-pigeon".to_string();
        config.agent.api_key = Some("key".to_string());
        let client = Client::new(config);
        let err = client.completion(Context::prompt("hi")).await.unwrap_err();
        assert!(err.contains("Unknown provider"));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_an_error() {
        let mut config = AppConfig::default();
        config.agent.api_key = None;
        config.agent.api_key_env = Some("WORKBENCH_TEST_UNSET_KEY".to_string());
        let client = Client::new(config);
        let err = client.completion(Context::prompt("hi")).await.unwrap_err();
        assert!(err.contains("WORKBENCH_TEST_UNSET_KEY"));
    }
}
