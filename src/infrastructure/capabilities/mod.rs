//! # Capabilities
//!
//! Read-only information tools the oracle may invoke by name. Each capability
//! declares its argument schema; the registry validates arguments before
//! dispatch and every handler turns its own failures into text.

mod lookup;
mod system;
mod web;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::domain::types::ToolArgs;

pub use lookup::{StockPrice, Weather, WikipediaSummary, WorldTime};
pub use system::SystemInfo;
pub use web::{ReadUrl, WebSearch};

const HTTP_TIMEOUT_SECS: u64 = 20;

/// A named, stateless lookup.
#[async_trait]
pub trait Capability: Send + Sync {
    fn name(&self) -> &'static str;

    /// Required argument names, in call order.
    fn params(&self) -> &'static [&'static str] {
        &[]
    }

    fn description(&self) -> &'static str;

    /// Runs the lookup. Arguments have already been validated against `params`.
    async fn invoke(&self, args: &ToolArgs) -> String;
}

/// Outcome of a registry call.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    Output(String),
    Unknown,
}

/// Name-keyed capability table.
pub struct CapabilityRegistry {
    capabilities: BTreeMap<&'static str, Box<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn empty() -> Self {
        Self {
            capabilities: BTreeMap::new(),
        }
    }

    /// The standard catalog.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(Weather));
        registry.register(Box::new(WebSearch));
        registry.register(Box::new(ReadUrl));
        registry.register(Box::new(SystemInfo));
        registry.register(Box::new(WikipediaSummary));
        registry.register(Box::new(StockPrice));
        registry.register(Box::new(WorldTime));
        registry
    }

    pub fn register(&mut self, capability: Box<dyn Capability>) {
        self.capabilities.insert(capability.name(), capability);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.capabilities.keys().copied().collect()
    }

    /// One line per capability: `- name(a, b): description`.
    pub fn catalog(&self) -> String {
        self.capabilities
            .values()
            .map(|c| format!("- `{}({})`: {}", c.name(), c.params().join(", "), c.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Validates `args` against the capability's schema and runs it.
    pub async fn invoke(&self, name: &str, args: &ToolArgs) -> Invocation {
        let Some(capability) = self.capabilities.get(name) else {
            tracing::warn!("Capability: unknown tool '{}'", name);
            return Invocation::Unknown;
        };

        if let Err(e) = validate_args(capability.params(), args) {
            tracing::warn!("Capability: rejected call to '{}': {}", name, e);
            return Invocation::Output(format!("Error: {}", e));
        }

        tracing::info!("Capability: invoking '{}'", name);
        Invocation::Output(capability.invoke(args).await)
    }
}

fn validate_args(params: &[&str], args: &ToolArgs) -> Result<(), String> {
    for param in params {
        match args.get(*param) {
            None | Some(Value::Null) => return Err(format!("missing argument '{}'", param)),
            Some(Value::Array(_)) | Some(Value::Object(_)) => {
                return Err(format!("argument '{}' must be a string", param));
            }
            Some(_) => {}
        }
    }
    if let Some(extra) = args.keys().find(|k| !params.contains(&k.as_str())) {
        return Err(format!("unexpected argument '{}'", extra));
    }
    Ok(())
}

/// A primitive argument as text. Numbers and booleans are stringified.
pub(crate) fn arg(args: &ToolArgs, name: &str) -> String {
    match args.get(name) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// HTTP client shared by the network-backed capabilities.
pub(crate) fn http_client() -> &'static reqwest::Client {
    use std::sync::OnceLock;
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .user_agent(concat!("workbench/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default()
    })
}
