//! # LLM API wrapper
//!
//! A unified interface over the supported LLM backends (Gemini and the
//! OpenAI-compatible family). The rest of the application only sees the
//! [`LlmProvider`](crate::domain::traits::LlmProvider) trait implemented by [`Client`].

mod client;
pub mod providers;
mod types;

pub use client::Client;

pub use types::{Context, Error, Message, MessageRole, Provider, Response, TokenUsage};
