//! # Main Entry Point
//!
//! Initializes the application:
//! - Domain: Configuration and Types
//! - Infrastructure: Workspace, Capabilities, LLM, Logging
//! - Application: Oracle, Dispatcher, Session
//! - Interface: Console and Commands
//!

mod application;
mod domain;
mod infrastructure;
mod interface;
mod strings;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::application::dispatcher::ActionDispatcher;
use crate::application::oracle::LlmOracle;
use crate::application::session::{SessionEngine, SessionState};
use crate::domain::config::AppConfig;
use crate::infrastructure::capabilities::CapabilityRegistry;
use crate::infrastructure::llm::Client as LlmClient;
use crate::infrastructure::workspace::Workspace;
use crate::interface::console::Console;

#[derive(Debug, Parser)]
#[command(name = "workbench", version, about = "Model-driven developer assistant with an approval gate")]
struct Cli {
    /// Config file (default: data/config.yaml, optional)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Working directory the agent is confined to
    #[arg(long)]
    workdir: Option<String>,

    /// LLM provider: gemini, openai, groq, xai
    #[arg(long)]
    provider: Option<String>,

    #[arg(long)]
    model: Option<String>,

    /// Run commands and writes without asking
    #[arg(long)]
    no_safe_mode: bool,

    /// Consecutive autonomous turns before control returns to the user
    #[arg(long)]
    max_continuations: Option<u32>,

    /// Pin a file at startup (repeatable)
    #[arg(long = "pin")]
    pins: Vec<String>,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(provider) = &self.provider {
            config.agent.provider = provider.clone();
            if self.model.is_none() {
                // Let the provider pick its own default model
                config.agent.model.clear();
            }
            if config.agent.api_key.is_none() {
                config.agent.api_key_env = Some(format!("{}_API_KEY", provider.to_uppercase()));
            }
        }
        if let Some(model) = &self.model {
            config.agent.model = model.clone();
        }
        if let Some(workdir) = &self.workdir {
            config.session.working_dir = workdir.clone();
        }
        if self.no_safe_mode {
            config.session.safe_mode = false;
        }
        if let Some(limit) = self.max_continuations {
            config.session.max_continuations = limit;
        }
        config.session.pinned_files.extend(self.pins.iter().cloned());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load Configuration
    let _ = dotenvy::dotenv();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    // 2. Logging Setup
    let _guard = infrastructure::logging::init(&config.logging)?;
    tracing::info!(
        "Starting Workbench at {}...",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    // 3. Initialize Infrastructure
    let workspace = Workspace::open(
        config.session.resolved_working_dir(),
        Duration::from_secs(config.commands.timeout),
    )
    .context("Failed to open working directory")?;
    tracing::info!("Working directory: {}", workspace.root().display());

    let registry = CapabilityRegistry::standard();
    tracing::info!("Capabilities: {}", registry.names().join(", "));
    let system_prompt = strings::prompts::system_prompt(&registry.catalog());

    if config.api_key().is_none() {
        tracing::warn!(
            "No API key configured for provider '{}'; requests will fail until one is set",
            config.agent.provider
        );
    }
    let llm = Arc::new(LlmClient::new(config.clone()));

    // 4. Initialize Application Components
    let oracle = LlmOracle::new(llm, system_prompt)
        .with_model(config.agent.model.clone())
        .with_temperature(config.agent.temperature);
    let dispatcher = ActionDispatcher::new(Arc::new(workspace), Arc::new(registry));
    let engine = SessionEngine::new(Arc::new(oracle), dispatcher)
        .with_max_continuations(config.session.max_continuations)
        .with_listing_depth(config.listing.max_depth);

    let mut state = SessionState::new(config.session.safe_mode);
    for path in &config.session.pinned_files {
        match engine.workspace().resolve(path) {
            Ok(p) if p.is_file() => {
                state.pin(path.clone());
            }
            _ => tracing::warn!("Ignoring pinned file '{}': not found in working directory", path),
        }
    }

    // 5. Run
    let banner = strings::messages::session_banner(
        &engine.workspace().root().display().to_string(),
        &config.agent.provider,
        if config.agent.model.is_empty() {
            "default"
        } else {
            &config.agent.model
        },
        config.session.safe_mode,
    );
    Console::new(engine, state).run(&banner).await
}
