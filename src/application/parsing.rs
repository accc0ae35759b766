//! # Parsing Utils
//!
//! Turns raw oracle text into a [`DecisionPayload`]. JSON-mode backends return a
//! bare object; others wrap it in a ```json fence or surround it with prose.

use regex::Regex;
use std::sync::OnceLock;

use crate::domain::types::DecisionPayload;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*\n?(.*?)```").unwrap())
}

/// Extracts the JSON document from a response.
fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') {
        return trimmed;
    }
    if let Some(body) = fence_regex().captures(trimmed).and_then(|caps| caps.get(1)) {
        return body.as_str().trim();
    }
    // Fallback: outermost braces
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// Parses a decision. Any shape error, including one malformed action, fails
/// the whole payload.
pub fn parse_decision(raw: &str) -> Result<DecisionPayload, String> {
    let json = extract_json(raw);
    if json.is_empty() {
        return Err("empty response".to_string());
    }
    serde_json::from_str(json).map_err(|e| format!("malformed decision: {}", e))
}
