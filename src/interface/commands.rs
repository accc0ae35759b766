//! # Console Commands
//!
//! Routes one input line: plain text goes to the agent, `.`-prefixed lines are
//! runtime controls (`.pin`, `.safe`, `.approve`, ...).

use crate::application::session::{SessionEngine, SessionState};
use crate::domain::types::ApprovalDecision;
use crate::strings::messages;

/// What the console should do after a line was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Print this and wait for the next line.
    Reply(String),
    /// The transcript changed; render it and keep driving the loop.
    Advanced,
    Quit,
    Nothing,
}

pub async fn route(engine: &SessionEngine, state: &mut SessionState, line: &str) -> Outcome {
    let msg = line.trim();
    if msg.is_empty() {
        return Outcome::Nothing;
    }
    if !msg.starts_with('.') {
        engine.submit(state, msg).await;
        return Outcome::Advanced;
    }

    let (cmd, args) = match msg.find(' ') {
        Some(idx) => (&msg[..idx], msg[idx + 1..].trim()),
        None => (msg, ""),
    };
    tracing::info!("Console dispatching cmd='{}' args='{}'", cmd, args);

    match cmd {
        ".pin" => handle_pin(engine, state, args),
        ".unpin" => handle_unpin(state, args),
        ".pinned" => Outcome::Reply(messages::pinned_list(state.pinned_files())),
        ".files" => {
            let subdir = if args.is_empty() { "." } else { args };
            Outcome::Reply(engine.workspace().list_files(subdir, engine.listing_depth()))
        }
        ".safe" => handle_safe(state, args),
        ".approve" | ".reject" => {
            if state.pending_actions.is_empty() {
                return Outcome::Reply(messages::NOTHING_PENDING.to_string());
            }
            let decision = if cmd == ".approve" {
                ApprovalDecision::Approved
            } else {
                ApprovalDecision::Rejected
            };
            engine.resolve(state, decision).await;
            Outcome::Advanced
        }
        ".help" => Outcome::Reply(messages::HELP.to_string()),
        ".quit" | ".exit" => Outcome::Quit,
        _ => Outcome::Reply(messages::UNKNOWN_COMMAND.to_string()),
    }
}

fn handle_pin(engine: &SessionEngine, state: &mut SessionState, path: &str) -> Outcome {
    if path.is_empty() {
        return Outcome::Reply(messages::usage("pin", "<path>"));
    }
    let exists = engine
        .workspace()
        .resolve(path)
        .map(|p| p.is_file())
        .unwrap_or(false);
    if !exists {
        return Outcome::Reply(messages::pin_missing(path));
    }
    state.pin(path);
    Outcome::Reply(messages::pinned(path))
}

fn handle_unpin(state: &mut SessionState, path: &str) -> Outcome {
    if path.is_empty() {
        return Outcome::Reply(messages::usage("unpin", "<path>"));
    }
    if state.unpin(path) {
        Outcome::Reply(messages::unpinned(path))
    } else {
        Outcome::Reply(messages::not_pinned(path))
    }
}

fn handle_safe(state: &mut SessionState, args: &str) -> Outcome {
    match args {
        "on" => state.safe_mode = true,
        "off" => state.safe_mode = false,
        "" => {}
        _ => return Outcome::Reply(messages::usage("safe", "on|off")),
    }
    tracing::info!("Console: safe mode {}", state.safe_mode);
    Outcome::Reply(messages::safe_mode_status(state.safe_mode))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dispatcher::ActionDispatcher;
    use crate::domain::traits::Oracle;
    use crate::domain::types::{Action, DecisionPayload};
    use crate::infrastructure::capabilities::CapabilityRegistry;
    use crate::infrastructure::llm::Message;
    use crate::infrastructure::workspace::Workspace;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Always proposes the same command.
    struct Proposer;

    #[async_trait]
    impl Oracle for Proposer {
        async fn decide(&self, _history: &[Message], _prompt: &str) -> DecisionPayload {
            DecisionPayload {
                thought: "t".to_string(),
                response: "r".to_string(),
                actions: vec![Action::command("touch made.txt")],
            }
        }
    }

    fn engine(dir: &TempDir) -> SessionEngine {
        let workspace = Workspace::open(dir.path(), Duration::from_secs(5)).unwrap();
        let dispatcher =
            ActionDispatcher::new(Arc::new(workspace), Arc::new(CapabilityRegistry::empty()));
        SessionEngine::new(Arc::new(Proposer), dispatcher)
    }

    #[tokio::test]
    async fn test_pin_commands() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.md"), "x").unwrap();
        let engine = engine(&dir);
        let mut state = SessionState::new(true);

        assert_eq!(
            route(&engine, &mut state, ".pin notes.md").await,
            Outcome::Reply(messages::pinned("notes.md"))
        );
        assert_eq!(
            route(&engine, &mut state, ".pin missing.md").await,
            Outcome::Reply(messages::pin_missing("missing.md"))
        );
        assert_eq!(
            route(&engine, &mut state, ".pin ../../etc/passwd").await,
            Outcome::Reply(messages::pin_missing("../../etc/passwd"))
        );
        assert_eq!(state.pinned_files(), ["notes.md".to_string()]);

        assert_eq!(
            route(&engine, &mut state, ".unpin notes.md").await,
            Outcome::Reply(messages::unpinned("notes.md"))
        );
        assert_eq!(
            route(&engine, &mut state, ".unpin notes.md").await,
            Outcome::Reply(messages::not_pinned("notes.md"))
        );
        assert_eq!(
            route(&engine, &mut state, ".pin").await,
            Outcome::Reply("Usage: `.pin <path>`".to_string())
        );
    }

    #[tokio::test]
    async fn test_safe_toggle() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let mut state = SessionState::new(true);

        route(&engine, &mut state, ".safe off").await;
        assert!(!state.safe_mode);
        route(&engine, &mut state, ".safe on").await;
        assert!(state.safe_mode);
        assert_eq!(
            route(&engine, &mut state, ".safe maybe").await,
            Outcome::Reply(messages::usage("safe", "on|off"))
        );
    }

    #[tokio::test]
    async fn test_message_then_approve() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let mut state = SessionState::new(true);

        assert_eq!(
            route(&engine, &mut state, ".approve").await,
            Outcome::Reply(messages::NOTHING_PENDING.to_string())
        );
        assert_eq!(route(&engine, &mut state, "make a file").await, Outcome::Advanced);
        assert_eq!(state.pending_actions.len(), 1);

        assert_eq!(route(&engine, &mut state, ".approve").await, Outcome::Advanced);
        assert!(state.pending_actions.is_empty());
        assert!(dir.path().join("made.txt").exists());
    }

    #[tokio::test]
    async fn test_misc_commands() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/main.rs"), "").unwrap();
        let engine = engine(&dir);
        let mut state = SessionState::new(true);

        assert_eq!(route(&engine, &mut state, "   ").await, Outcome::Nothing);
        assert_eq!(route(&engine, &mut state, ".quit").await, Outcome::Quit);
        assert_eq!(
            route(&engine, &mut state, ".frobnicate").await,
            Outcome::Reply(messages::UNKNOWN_COMMAND.to_string())
        );
        match route(&engine, &mut state, ".files src").await {
            Outcome::Reply(tree) => assert!(tree.contains("main.rs")),
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
