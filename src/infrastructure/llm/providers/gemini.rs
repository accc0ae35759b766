//! Gemini provider
//!
//! Calls `generateContent` with the system prompt in `systemInstruction` and,
//! when requested, `responseMimeType: application/json`.

use serde::{Deserialize, Serialize};

use super::{ProviderConfig, error_message, http_client};
use crate::infrastructure::llm::{Context, Error, MessageRole, Response, TokenUsage};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Gemini API request format
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

/// Gemini content (message)
#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

/// Gemini content part
#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

/// Generation configuration
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

/// Gemini API response format
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

fn build_request(context: &Context) -> GeminiRequest {
    // Gemini has no system role inside `contents`; system text goes to systemInstruction.
    let system_instruction = context.system_instruction().map(|text| GeminiContent {
        role: None,
        parts: vec![GeminiPart { text }],
    });

    let contents = context
        .messages
        .iter()
        .filter(|msg| msg.role != MessageRole::System)
        .map(|msg| GeminiContent {
            role: Some(
                match msg.role {
                    MessageRole::Assistant => "model",
                    _ => "user",
                }
                .to_string(),
            ),
            parts: vec![GeminiPart {
                text: msg.content.clone(),
            }],
        })
        .collect();

    let generation_config =
        if context.temperature.is_some() || context.max_tokens.is_some() || context.json_mode {
            Some(GenerationConfig {
                temperature: context.temperature,
                max_output_tokens: context.max_tokens,
                response_mime_type: context.json_mode.then(|| "application/json".to_string()),
            })
        } else {
            None
        };

    GeminiRequest {
        system_instruction,
        contents,
        generation_config,
    }
}

/// Execute a chat request using Gemini's API
pub async fn chat(config: ProviderConfig, context: Context) -> Result<Response, Error> {
    let base_url = config
        .base_url
        .clone()
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let model = context.model.clone().unwrap_or_else(|| {
        if config.default_model.is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            config.default_model.clone()
        }
    });

    let url = format!("{}/v1beta/models/{}:generateContent", base_url, model);
    let request = build_request(&context);

    let response = http_client()
        .post(&url)
        .timeout(config.request_timeout())
        .header("x-goog-api-key", &config.api_key)
        .json(&request)
        .send()
        .await
        .map_err(|e| Error::new("gemini", format!("HTTP request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        return Err(error_message("gemini", status, &error_text));
    }

    let gemini_response: GeminiResponse = response
        .json()
        .await
        .map_err(|e| Error::new("gemini", format!("Failed to parse response: {}", e)))?;

    let candidate = gemini_response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::new("gemini", "No candidates in response"))?;

    let content: String = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if content.is_empty() {
        return Err(Error::new(
            "gemini",
            format!(
                "Empty response (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ),
        ));
    }

    let usage = gemini_response.usage_metadata.unwrap_or_default();

    Ok(Response {
        content,
        model,
        usage: TokenUsage {
            prompt_tokens: usage.prompt_token_count,
            completion_tokens: usage.candidates_token_count,
            total_tokens: usage.total_token_count,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::Message;

    #[test]
    fn test_request_shape() {
        let context = Context::new()
            .add_system_message("Respond in JSON.")
            .add_message(Message::user("hello"))
            .add_message(Message::assistant("{}"))
            .add_message(Message::user("again"))
            .with_json_mode();

        let json = serde_json::to_value(build_request(&context)).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "Respond in JSON.");
        assert_eq!(json["contents"].as_array().unwrap().len(), 3);
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_plain_request_has_no_generation_config() {
        let json = serde_json::to_value(build_request(&Context::prompt("hi"))).unwrap();
        assert!(json.get("generationConfig").is_none());
        assert!(json.get("systemInstruction").is_none());
    }
}
