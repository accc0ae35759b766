//! # Conversation Oracle
//!
//! Adapts an [`LlmProvider`] to the [`Oracle`] contract: history plus one prompt
//! in, one decision out. Transport and format failures degrade instead of erroring.

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::parsing::parse_decision;
use crate::domain::traits::{LlmProvider, Oracle};
use crate::domain::types::DecisionPayload;
use crate::infrastructure::llm::{Context, Message};

pub struct LlmOracle {
    provider: Arc<dyn LlmProvider>,
    model: Option<String>,
    system_prompt: String,
    temperature: Option<f32>,
}

impl LlmOracle {
    pub fn new(provider: Arc<dyn LlmProvider>, system_prompt: impl Into<String>) -> Self {
        Self {
            provider,
            model: None,
            system_prompt: system_prompt.into(),
            temperature: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.model = (!model.is_empty()).then_some(model);
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    fn build_context(&self, history: &[Message], prompt: &str) -> Context {
        let mut context = Context::new()
            .add_system_message(self.system_prompt.clone())
            .with_temperature(self.temperature)
            .with_json_mode();
        if let Some(model) = &self.model {
            context = context.with_model(model.clone());
        }
        for message in history {
            context = context.add_message(message.clone());
        }
        context.add_user_message(prompt)
    }
}

#[async_trait]
impl Oracle for LlmOracle {
    async fn decide(&self, history: &[Message], prompt: &str) -> DecisionPayload {
        let context = self.build_context(history, prompt);
        tracing::info!(
            "Oracle: request with {} prior messages, prompt {} chars",
            history.len(),
            prompt.len()
        );

        let raw = match self.provider.completion(context).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Oracle: backend call failed: {}", e);
                return DecisionPayload::degraded(format!("API Error: {}", e));
            }
        };

        match parse_decision(&raw) {
            Ok(payload) => {
                tracing::info!("Oracle: decision with {} actions", payload.actions.len());
                payload
            }
            Err(e) => {
                tracing::warn!("Oracle: {}. Raw response:\n{}", e, raw);
                DecisionPayload::degraded(format!("Error parsing response: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Action;
    use crate::infrastructure::llm::MessageRole;
    use std::sync::Mutex;

    /// Replays one canned completion and records the request it saw.
    struct CannedProvider {
        reply: Result<String, String>,
        seen: Mutex<Option<Context>>,
    }

    impl CannedProvider {
        fn new(reply: Result<&str, &str>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(str::to_string).map_err(str::to_string),
                seen: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for CannedProvider {
        async fn completion(&self, context: Context) -> Result<String, String> {
            *self.seen.lock().unwrap() = Some(context);
            self.reply.clone()
        }
    }

    #[tokio::test]
    async fn test_decide_builds_context() {
        let provider = CannedProvider::new(Ok(
            r#"{"thought": "t", "response": "r", "actions": [{"type": "command", "command": "ls"}]}"#,
        ));
        let oracle = LlmOracle::new(provider.clone(), "SYSTEM").with_model("m1");
        let history = vec![Message::user("earlier"), Message::assistant("{}")];

        let payload = oracle.decide(&history, "now").await;
        assert_eq!(payload.actions, vec![Action::command("ls")]);

        let seen = provider.seen.lock().unwrap().clone().unwrap();
        assert!(seen.json_mode);
        assert_eq!(seen.model.as_deref(), Some("m1"));
        let roles: Vec<MessageRole> = seen.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::System,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User
            ]
        );
        assert_eq!(seen.messages[3].content, "now");
    }

    #[tokio::test]
    async fn test_backend_failure_degrades() {
        let oracle = LlmOracle::new(CannedProvider::new(Err("[gemini] HTTP 500: boom")), "SYSTEM");
        let payload = oracle.decide(&[], "hi").await;
        assert!(payload.is_degraded());
        assert_eq!(payload.response, "API Error: [gemini] HTTP 500: boom");
    }

    #[tokio::test]
    async fn test_malformed_response_degrades() {
        let oracle = LlmOracle::new(CannedProvider::new(Ok("I refuse to answer in JSON")), "SYSTEM");
        let payload = oracle.decide(&[], "hi").await;
        assert!(payload.is_degraded());
        assert!(payload.response.starts_with("Error parsing response"));
    }
}
