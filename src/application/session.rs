//! # Session State Machine
//!
//! Drives the propose / preview / approve / execute loop. All mutable session
//! data lives in [`SessionState`]; [`SessionEngine`] owns the collaborators and
//! applies one transition per call (`submit`, `resolve`, `tick`).

use std::sync::Arc;

use crate::application::dispatcher::{ActionDispatcher, BatchPolicy};
use crate::domain::traits::Oracle;
use crate::domain::types::{Action, ApprovalDecision, ConversationEntry};
use crate::infrastructure::llm::Message;
use crate::infrastructure::workspace::Workspace;
use crate::strings::{messages, prompts};

pub const DEFAULT_MAX_CONTINUATIONS: u32 = 25;
pub const DEFAULT_LISTING_DEPTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingApproval,
    AutoContinuing,
}

/// Everything that changes during a session. Dropped at exit.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub transcript: Vec<ConversationEntry>,
    /// Batch awaiting approval; empty when none.
    pub pending_actions: Vec<Action>,
    pub continuation: bool,
    pub safe_mode: bool,
    pinned_files: Vec<String>,
    /// Turns as the oracle saw them (prompts with context, raw decisions).
    history: Vec<Message>,
    /// Autonomous turns since the user last intervened.
    autonomous_turns: u32,
}

impl SessionState {
    pub fn new(safe_mode: bool) -> Self {
        Self {
            safe_mode,
            ..Default::default()
        }
    }

    pub fn phase(&self) -> Phase {
        if !self.pending_actions.is_empty() {
            Phase::AwaitingApproval
        } else if self.continuation {
            Phase::AutoContinuing
        } else {
            Phase::Idle
        }
    }

    pub fn pinned_files(&self) -> &[String] {
        &self.pinned_files
    }

    /// Returns false if the path was already pinned.
    pub fn pin(&mut self, path: impl Into<String>) -> bool {
        let path = path.into();
        if self.pinned_files.contains(&path) {
            return false;
        }
        self.pinned_files.push(path);
        true
    }

    /// Returns false if the path was not pinned.
    pub fn unpin(&mut self, path: &str) -> bool {
        let before = self.pinned_files.len();
        self.pinned_files.retain(|p| p != path);
        self.pinned_files.len() != before
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }
}

pub struct SessionEngine {
    oracle: Arc<dyn Oracle>,
    dispatcher: ActionDispatcher,
    max_continuations: u32,
    listing_depth: usize,
}

impl SessionEngine {
    pub fn new(oracle: Arc<dyn Oracle>, dispatcher: ActionDispatcher) -> Self {
        Self {
            oracle,
            dispatcher,
            max_continuations: DEFAULT_MAX_CONTINUATIONS,
            listing_depth: DEFAULT_LISTING_DEPTH,
        }
    }

    pub fn with_max_continuations(mut self, limit: u32) -> Self {
        self.max_continuations = limit;
        self
    }

    pub fn with_listing_depth(mut self, depth: usize) -> Self {
        self.listing_depth = depth;
        self
    }

    pub fn workspace(&self) -> &Workspace {
        self.dispatcher.workspace()
    }

    pub fn listing_depth(&self) -> usize {
        self.listing_depth
    }

    /// New user text. A batch still awaiting approval is rejected first.
    pub async fn submit(&self, state: &mut SessionState, input: &str) {
        if !state.pending_actions.is_empty() {
            tracing::info!(
                "Session: new input discards {} pending actions",
                state.pending_actions.len()
            );
            self.resolve(state, ApprovalDecision::Rejected).await;
        }

        state.transcript.push(ConversationEntry::user(input));
        state.autonomous_turns = 0;
        self.run_turn(state, input).await;
    }

    /// Applies the user's answer to the pending batch. No-op without one.
    pub async fn resolve(&self, state: &mut SessionState, decision: ApprovalDecision) {
        if state.pending_actions.is_empty() {
            return;
        }

        match decision {
            ApprovalDecision::Pending => {}
            ApprovalDecision::Approved => {
                let actions = std::mem::take(&mut state.pending_actions);
                tracing::info!("Session: approved batch of {} actions", actions.len());
                let output = self.dispatcher.execute(&actions).await;

                state.transcript.push(
                    ConversationEntry::assistant(messages::ACTIONS_EXECUTED)
                        .with_output(output.clone()),
                );
                state
                    .transcript
                    .push(ConversationEntry::user(prompts::execution_result(&output)));
                state.continuation = true;
                state.autonomous_turns = 0;
            }
            ApprovalDecision::Rejected => {
                tracing::info!(
                    "Session: rejected batch of {} actions",
                    state.pending_actions.len()
                );
                state.pending_actions.clear();
                state
                    .transcript
                    .push(ConversationEntry::assistant(messages::ACTIONS_REJECTED));
                state.continuation = false;
            }
        }
    }

    /// One autonomous step: the last transcript entry becomes the next request.
    pub async fn tick(&self, state: &mut SessionState) {
        if state.phase() != Phase::AutoContinuing {
            return;
        }

        if state.autonomous_turns >= self.max_continuations {
            tracing::warn!(
                "Session: continuation limit ({}) reached",
                self.max_continuations
            );
            state.transcript.push(ConversationEntry::assistant(
                messages::continuation_limit(self.max_continuations),
            ));
            state.continuation = false;
            return;
        }

        let Some(request) = state.transcript.last().map(|entry| entry.content.clone()) else {
            state.continuation = false;
            return;
        };
        state.autonomous_turns += 1;
        self.run_turn(state, &request).await;
    }

    async fn run_turn(&self, state: &mut SessionState, request: &str) {
        let prompt = self.build_prompt(state, request).await;
        let mut payload = self.oracle.decide(&state.history, &prompt).await;

        // Failed calls never reach the backend's own history either
        if !payload.is_degraded() {
            let raw = serde_json::to_string(&payload).unwrap_or_default();
            state.history.push(Message::user(prompt));
            state.history.push(Message::assistant(raw));
            tracing::debug!("Session: oracle history at {} messages", state.history().len());
        }

        state.transcript.push(ConversationEntry::assistant(prompts::assistant_turn(
            &payload.thought,
            &payload.response,
        )));

        if payload.actions.is_empty() {
            state.continuation = false;
            return;
        }

        let mut actions = std::mem::take(&mut payload.actions);
        let policy = BatchPolicy::classify(&actions, state.safe_mode);
        tracing::info!("Session: batch of {} actions classified {:?}", actions.len(), policy);

        match policy {
            BatchPolicy::RequiresApproval => {
                self.dispatcher.prepare_preview(&mut actions).await;
                state.pending_actions = actions;
                state.continuation = false;
            }
            BatchPolicy::AutoExecute | BatchPolicy::ExecuteImmediately => {
                let output = self.dispatcher.execute(&actions).await;
                state
                    .transcript
                    .push(ConversationEntry::assistant(output.clone()));
                state
                    .transcript
                    .push(ConversationEntry::user(prompts::execution_result(&output)).hidden());
                state.continuation = true;
            }
        }
    }

    async fn build_prompt(&self, state: &SessionState, request: &str) -> String {
        let workspace = self.workspace();
        let tree = workspace.list_files(".", self.listing_depth);

        let mut pinned = Vec::with_capacity(state.pinned_files.len());
        for path in &state.pinned_files {
            pinned.push((path.clone(), workspace.read_file(path).await));
        }

        let root = workspace.root().display().to_string();
        prompts::request_prompt(&prompts::build_context(&root, &tree, &pinned), request)
    }
}
