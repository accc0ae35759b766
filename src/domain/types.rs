//! # Domain Types
//!
//! Data structures shared by the oracle boundary, the dispatcher and the session loop.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Named arguments passed to a capability.
pub type ToolArgs = BTreeMap<String, Value>;

/// A single effect proposed by the oracle.
///
/// The wire form is a JSON object tagged by `type` (`command`, `write`, `tool`).
/// Unknown tags or missing required fields fail deserialization, which fails the
/// whole decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    Command {
        command: String,
        #[serde(default)]
        description: String,
    },
    Write {
        path: String,
        content: String,
        #[serde(default)]
        description: String,
        /// Dry-run preview, attached by the dispatcher before approval.
        #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
        diff: Option<String>,
    },
    Tool {
        tool_name: String,
        #[serde(default)]
        args: ToolArgs,
        #[serde(default)]
        description: String,
    },
}

impl Action {
    pub fn command(command: impl Into<String>) -> Self {
        Action::Command {
            command: command.into(),
            description: String::new(),
        }
    }

    pub fn write(path: impl Into<String>, content: impl Into<String>) -> Self {
        Action::Write {
            path: path.into(),
            content: content.into(),
            description: String::new(),
            diff: None,
        }
    }

    pub fn tool(tool_name: impl Into<String>, args: ToolArgs) -> Self {
        Action::Tool {
            tool_name: tool_name.into(),
            args,
            description: String::new(),
        }
    }

    /// Upper-case kind label used when presenting a batch.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Command { .. } => "COMMAND",
            Action::Write { .. } => "WRITE",
            Action::Tool { .. } => "TOOL",
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Action::Command { description, .. }
            | Action::Write { description, .. }
            | Action::Tool { description, .. } => description,
        }
    }

    /// Read-only actions may run without approval.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Action::Tool { .. })
    }
}

/// The oracle's structured answer for one turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DecisionPayload {
    #[serde(default)]
    pub thought: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl DecisionPayload {
    pub const DEGRADED_THOUGHT: &'static str = "Error processing request";

    /// Payload returned when the oracle call fails or yields malformed data.
    pub fn degraded(error: impl Into<String>) -> Self {
        Self {
            thought: Self::DEGRADED_THOUGHT.to_string(),
            response: error.into(),
            actions: Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.thought == Self::DEGRADED_THOUGHT && self.actions.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One transcript line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationEntry {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Kept for oracle context, never rendered.
    #[serde(default)]
    pub hidden: bool,
}

impl ConversationEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            output: None,
            hidden: false,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            output: None,
            hidden: false,
        }
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WriteAction {
    WouldWrite,
    Wrote,
}

impl WriteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteAction::WouldWrite => "would_write",
            WriteAction::Wrote => "wrote",
        }
    }
}

/// Outcome of a workspace write, dry-run or real.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteResult {
    Success {
        diff: String,
        action: WriteAction,
        path: String,
    },
    Failed {
        error: String,
    },
}

impl WriteResult {
    pub fn is_success(&self) -> bool {
        matches!(self, WriteResult::Success { .. })
    }

    pub fn diff(&self) -> Option<&str> {
        match self {
            WriteResult::Success { diff, .. } => Some(diff),
            WriteResult::Failed { .. } => None,
        }
    }

    /// Wire form: `{success, diff, action, path}` or `{success: false, error}`.
    pub fn to_json(&self) -> Value {
        match self {
            WriteResult::Success { diff, action, path } => serde_json::json!({
                "success": true,
                "diff": diff,
                "action": action.as_str(),
                "path": path,
            }),
            WriteResult::Failed { error } => serde_json::json!({
                "success": false,
                "error": error,
            }),
        }
    }
}

impl fmt::Display for WriteResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// The user's answer to a pending batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approved,
    Rejected,
    /// No decision yet; the batch stays pending.
    Pending,
}
