//! # Domain Traits
//!
//! Abstract interfaces for the pluggable boundaries (LLM backend, conversation oracle).
//! Implementations live in the Infrastructure and Application layers.

use async_trait::async_trait;

use crate::domain::types::DecisionPayload;
use crate::infrastructure::llm::{Context, Message};

/// Abstract interface for an LLM Provider
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for a full request context.
    async fn completion(&self, context: Context) -> Result<String, String>;
}

/// The conversation oracle: prior turns plus one prompt in, one decision out.
///
/// Implementations never fail; transport and format errors come back as
/// [`DecisionPayload::degraded`].
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn decide(&self, history: &[Message], prompt: &str) -> DecisionPayload;
}
