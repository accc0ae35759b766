//! # Infrastructure Layer
//!
//! Handles interactions with external systems: the filesystem sandbox, the
//! capability lookups and the LLM HTTP backends.
//! Implements the traits defined in the Domain layer (e.g., LlmProvider).

pub mod capabilities;
pub mod llm;
pub mod logging;
pub mod workspace;
