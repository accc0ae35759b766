//! # Console
//!
//! Line-oriented front-end: reads stdin, routes each line through
//! [`commands::route`], prints new transcript entries and drives autonomous
//! continuation until the session is idle or awaiting approval.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::application::session::{Phase, SessionEngine, SessionState};
use crate::domain::types::{Action, ConversationEntry, Role};
use crate::interface::commands::{self, Outcome};
use crate::strings::messages;

pub struct Console {
    engine: SessionEngine,
    state: SessionState,
    /// Transcript entries already printed.
    rendered: usize,
}

impl Console {
    pub fn new(engine: SessionEngine, state: SessionState) -> Self {
        Self {
            engine,
            state,
            rendered: 0,
        }
    }

    pub async fn run(mut self, banner: &str) -> Result<()> {
        println!("{}\n", banner);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print_prompt(self.state.phase());
            let Some(line) = lines.next_line().await? else {
                break;
            };

            match commands::route(&self.engine, &mut self.state, &line).await {
                Outcome::Reply(text) => println!("{}\n", text),
                Outcome::Quit => break,
                Outcome::Nothing => {}
                Outcome::Advanced => self.drive().await,
            }
        }

        tracing::info!("Console: session ended");
        Ok(())
    }

    /// Prints progress and ticks until the loop stops on its own.
    async fn drive(&mut self) {
        self.flush_transcript();
        while self.state.phase() == Phase::AutoContinuing {
            self.engine.tick(&mut self.state).await;
            self.flush_transcript();
        }
        if self.state.phase() == Phase::AwaitingApproval {
            println!("{}", render_pending(&self.state.pending_actions));
            println!("{}\n", messages::APPROVAL_PROMPT);
        }
    }

    fn flush_transcript(&mut self) {
        for entry in &self.state.transcript[self.rendered..] {
            if let Some(text) = render_entry(entry) {
                println!("{}\n", text);
            }
        }
        self.rendered = self.state.transcript.len();
    }
}

fn print_prompt(phase: Phase) {
    use std::io::Write;
    let marker = match phase {
        Phase::AwaitingApproval => "approve? > ",
        _ => "> ",
    };
    print!("{}", marker);
    let _ = std::io::stdout().flush();
}

/// Text for one transcript entry; `None` for hidden entries and echoed user input.
pub fn render_entry(entry: &ConversationEntry) -> Option<String> {
    if entry.hidden {
        return None;
    }
    match entry.role {
        // The user's own lines are already on screen, synthetic ones are not
        Role::User if !entry.content.starts_with("System Execution Result:") => None,
        Role::User => Some(format!("[system]\n{}", entry.content)),
        Role::Assistant => Some(match &entry.output {
            Some(output) => format!("{}\n```\n{}\n```", entry.content, output),
            None => entry.content.clone(),
        }),
    }
}

/// Numbered preview of a batch awaiting approval.
pub fn render_pending(actions: &[Action]) -> String {
    let mut out = String::from("⚠️ Review Proposed Actions\n");
    for (i, action) in actions.iter().enumerate() {
        out.push_str(&format!("\n{}. {}", i + 1, action.kind()));
        if !action.description().is_empty() {
            out.push_str(&format!(" ({})", action.description()));
        }
        out.push('\n');

        match action {
            Action::Command { command, .. } => {
                out.push_str(&format!("```bash\n{}\n```\n", command));
            }
            Action::Write {
                path,
                content,
                diff,
                ..
            } => {
                out.push_str(&format!("File: `{}`\n", path));
                match diff {
                    Some(diff) => out.push_str(&format!("Changes:\n```diff\n{}```\n", diff)),
                    None => out.push_str(&format!("Content:\n```\n{}\n```\n", content)),
                }
            }
            Action::Tool {
                tool_name, args, ..
            } => {
                let args = serde_json::to_string_pretty(args).unwrap_or_default();
                out.push_str(&format!("Tool: `{}`\n{}\n", tool_name, args));
            }
        }
    }
    out
}
