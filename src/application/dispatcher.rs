//! # Action Dispatcher
//!
//! Classifies a batch against the approval policy, attaches dry-run previews and
//! executes actions in order against the workspace and the capability registry.

use std::sync::Arc;

use crate::domain::types::Action;
use crate::infrastructure::capabilities::{CapabilityRegistry, Invocation};
use crate::infrastructure::workspace::Workspace;

/// What the session should do with a proposed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPolicy {
    /// Only read-only tools: run now, whatever the safe-mode setting.
    AutoExecute,
    /// Safe mode and at least one mutating action.
    RequiresApproval,
    /// Safe mode off.
    ExecuteImmediately,
}

impl BatchPolicy {
    pub fn classify(actions: &[Action], safe_mode: bool) -> Self {
        if actions.iter().all(Action::is_read_only) {
            BatchPolicy::AutoExecute
        } else if safe_mode {
            BatchPolicy::RequiresApproval
        } else {
            BatchPolicy::ExecuteImmediately
        }
    }
}

#[derive(Clone)]
pub struct ActionDispatcher {
    workspace: Arc<Workspace>,
    registry: Arc<CapabilityRegistry>,
}

impl ActionDispatcher {
    pub fn new(workspace: Arc<Workspace>, registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            workspace,
            registry,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Attaches a dry-run diff to every Write action. A failed dry run leaves
    /// the action without a diff, so the preview falls back to its content.
    pub async fn prepare_preview(&self, actions: &mut [Action]) {
        for action in actions.iter_mut() {
            if let Action::Write {
                path,
                content,
                diff,
                ..
            } = action
            {
                let result = self.workspace.write_file(path, content, true).await;
                *diff = result.diff().map(str::to_string);
            }
        }
    }

    /// Runs the batch in order and returns one output block per action, newline-joined.
    pub async fn execute(&self, actions: &[Action]) -> String {
        let mut outputs = Vec::with_capacity(actions.len());
        for (i, action) in actions.iter().enumerate() {
            tracing::info!(
                "Dispatcher: executing action {}/{} ({})",
                i + 1,
                actions.len(),
                action.kind()
            );
            outputs.push(self.execute_one(action).await);
        }
        outputs.join("\n")
    }

    async fn execute_one(&self, action: &Action) -> String {
        match action {
            Action::Command { command, .. } => {
                let output = self.workspace.run_command(command).await;
                format!("$ {}\n{}", command, output)
            }
            Action::Write { path, content, .. } => {
                let result = self.workspace.write_file(path, content, false).await;
                if !result.is_success() {
                    tracing::warn!("Dispatcher: write to '{}' failed", path);
                }
                format!("Writing {}: {}", path, result)
            }
            Action::Tool {
                tool_name, args, ..
            } => match self.registry.invoke(tool_name, args).await {
                Invocation::Output(output) => format!("Tool '{}' output: {}", tool_name, output),
                Invocation::Unknown => format!("Unknown tool: {}", tool_name),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ToolArgs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn dispatcher(dir: &TempDir) -> ActionDispatcher {
        let workspace = Workspace::open(dir.path(), Duration::from_secs(5)).unwrap();
        ActionDispatcher::new(Arc::new(workspace), Arc::new(CapabilityRegistry::empty()))
    }

    #[test]
    fn test_classify() {
        let tool = Action::tool("get_weather", ToolArgs::new());
        let command = Action::command("ls");

        assert_eq!(BatchPolicy::classify(&[tool.clone()], true), BatchPolicy::AutoExecute);
        assert_eq!(BatchPolicy::classify(&[tool.clone()], false), BatchPolicy::AutoExecute);
        assert_eq!(
            BatchPolicy::classify(&[command.clone(), tool.clone()], true),
            BatchPolicy::RequiresApproval
        );
        assert_eq!(
            BatchPolicy::classify(&[command, tool], false),
            BatchPolicy::ExecuteImmediately
        );
    }

    #[tokio::test]
    async fn test_preview_attaches_diff_without_writing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "old\n").unwrap();
        let dispatcher = dispatcher(&dir);

        let mut actions = vec![Action::command("ls"), Action::write("notes.txt", "new\n")];
        dispatcher.prepare_preview(&mut actions).await;

        match &actions[1] {
            Action::Write { diff: Some(diff), .. } => {
                assert!(diff.contains("-old"));
                assert!(diff.contains("+new"));
            }
            other => panic!("expected a previewed write, got {:?}", other),
        }
        assert_eq!(std::fs::read_to_string(dir.path().join("notes.txt")).unwrap(), "old\n");
    }

    #[tokio::test]
    async fn test_preview_of_escaping_write_has_no_diff() {
        let dir = TempDir::new().unwrap();
        let dispatcher = dispatcher(&dir);
        let mut actions = vec![Action::write("../outside.txt", "x")];
        dispatcher.prepare_preview(&mut actions).await;
        assert!(matches!(&actions[0], Action::Write { diff: None, .. }));
    }

    #[tokio::test]
    async fn test_execute_in_order() {
        let dir = TempDir::new().unwrap();
        let dispatcher = dispatcher(&dir);

        let actions = vec![
            Action::write("hello.txt", "hi there\n"),
            Action::command("cat hello.txt"),
            Action::tool("frobnicate", ToolArgs::new()),
        ];
        let output = dispatcher.execute(&actions).await;

        let write_at = output.find("Writing hello.txt:").unwrap();
        let cat_at = output.find("$ cat hello.txt\nhi there").unwrap();
        let tool_at = output.find("Unknown tool: frobnicate").unwrap();
        assert!(write_at < cat_at && cat_at < tool_at);
        assert!(output.contains(r#""success":true"#));
    }

    #[tokio::test]
    async fn test_failed_write_does_not_stop_batch() {
        let dir = TempDir::new().unwrap();
        let dispatcher = dispatcher(&dir);

        let actions = vec![Action::write("../escape.txt", "x"), Action::command("echo after")];
        let output = dispatcher.execute(&actions).await;
        assert!(output.contains(r#""success":false"#));
        assert!(output.contains("$ echo after\nafter"));
    }
}
