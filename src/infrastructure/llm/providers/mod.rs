//! # LLM Providers
//!
//! Wire-level implementations for each backend:
//! - Gemini (`generateContent`, with system instruction and JSON response mode)
//! - OpenAI-compatible chat completions (OpenAI, Groq, xAI)

mod gemini;
mod openai;

use std::time::Duration;

use crate::domain::config::AppConfig;
use crate::infrastructure::llm::{Context, Error, Provider, Response};

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for a provider
#[derive(Clone)]
pub struct ProviderConfig {
    /// API key
    pub api_key: String,
    /// Base URL (for non-default endpoints)
    pub base_url: Option<String>,
    /// Default model
    pub default_model: String,
    /// Timeout in seconds
    pub timeout: Option<u64>,
    pub temperature: Option<f32>,
}

impl ProviderConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let agent = &config.agent;
        let api_key = config.api_key().ok_or_else(|| match &agent.api_key_env {
            Some(var) => Error::new(
                &agent.provider,
                format!("API key env var {} not set", var),
            ),
            None => Error::new(
                &agent.provider,
                "No API key provided - set api_key or api_key_env",
            ),
        })?;

        Ok(Self {
            api_key,
            base_url: agent.endpoint.clone(),
            default_model: agent.model.clone(),
            timeout: agent.timeout,
            temperature: agent.temperature,
        })
    }

    pub(crate) fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    fn with_base_url(self, url: &str) -> Self {
        Self {
            base_url: Some(self.base_url.unwrap_or_else(|| url.to_string())),
            ..self
        }
    }
}

/// HTTP client reused across requests
pub(crate) fn http_client() -> &'static reqwest::Client {
    use std::sync::OnceLock;
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(reqwest::Client::new)
}

/// Execute a chat request with the specified provider
pub async fn chat(
    provider: Provider,
    config: ProviderConfig,
    mut context: Context,
) -> Result<Response, Error> {
    if context.temperature.is_none() {
        context.temperature = config.temperature;
    }

    match provider {
        Provider::Gemini => gemini::chat(config, context).await,
        Provider::OpenAI => openai::chat(provider, config, context).await,
        Provider::Groq => {
            // Groq uses OpenAI-compatible API
            let config = config.with_base_url("https://api.groq.com/openai/v1");
            openai::chat(provider, config, context).await
        }
        Provider::XAI => {
            // xAI uses OpenAI-compatible API
            let config = config.with_base_url("https://api.x.ai/v1");
            openai::chat(provider, config, context).await
        }
    }
}

/// Pulls a human-readable message out of a provider error body.
pub(crate) fn error_message(provider: &str, status: reqwest::StatusCode, body: &str) -> Error {
    if let Ok(error_json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(msg) = error_json
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return Error::new(provider, format!("HTTP {}: {}", status, msg));
        }
    }
    Error::new(provider, format!("HTTP {}: {}", status, body))
}
