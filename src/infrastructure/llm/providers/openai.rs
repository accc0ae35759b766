//! OpenAI-compatible API provider
//!
//! Serves OpenAI, Groq and xAI, which share the `/chat/completions` wire format.

use serde::{Deserialize, Serialize};

use super::{ProviderConfig, error_message, http_client};
use crate::infrastructure::llm::{Context, Error, Provider, Response, TokenUsage};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI API request format
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// OpenAI API response format
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

fn default_model(provider: Provider) -> &'static str {
    match provider {
        Provider::Groq => "llama-3.3-70b-versatile",
        Provider::XAI => "grok-beta",
        _ => "gpt-4o-mini",
    }
}

fn build_request(model: String, context: Context) -> OpenAIRequest {
    OpenAIRequest {
        model,
        messages: context
            .messages
            .into_iter()
            .map(|msg| OpenAIMessage {
                role: msg.role.as_str().to_string(),
                content: msg.content,
            })
            .collect(),
        temperature: context.temperature,
        max_tokens: context.max_tokens,
        response_format: context
            .json_mode
            .then_some(ResponseFormat { kind: "json_object" }),
    }
}

/// Execute a chat request using OpenAI-compatible API
pub async fn chat(
    provider: Provider,
    config: ProviderConfig,
    context: Context,
) -> Result<Response, Error> {
    let name = provider.as_str();
    let base_url = config
        .base_url
        .clone()
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let model = context.model.clone().unwrap_or_else(|| {
        if config.default_model.is_empty() {
            default_model(provider).to_string()
        } else {
            config.default_model.clone()
        }
    });

    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
    let request = build_request(model, context);

    let response = http_client()
        .post(&url)
        .timeout(config.request_timeout())
        .bearer_auth(&config.api_key)
        .json(&request)
        .send()
        .await
        .map_err(|e| Error::new(name, format!("HTTP request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        return Err(error_message(name, status, &error_text));
    }

    let openai_response: OpenAIResponse = response
        .json()
        .await
        .map_err(|e| Error::new(name, format!("Failed to parse response: {}", e)))?;

    let content = openai_response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| Error::new(name, "No choices in response"))?;

    let usage = openai_response
        .usage
        .map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    Ok(Response {
        content,
        model: openai_response.model,
        usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_mode_sets_response_format() {
        let context = Context::new()
            .add_system_message("sys")
            .add_user_message("hi")
            .with_json_mode();
        let json = serde_json::to_value(build_request("gpt-4o-mini".to_string(), context)).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_default_models() {
        assert_eq!(default_model(Provider::Groq), "llama-3.3-70b-versatile");
        assert_eq!(default_model(Provider::OpenAI), "gpt-4o-mini");
    }
}
