//! # Messages
//!
//! Contains constant strings and format functions for user-facing messages.
//! Includes transcript notices, console feedback and the help text.

pub const ACTIONS_EXECUTED: &str = "✅ Actions executed successfully.";
pub const ACTIONS_REJECTED: &str = "❌ Actions rejected by user.";
pub const NOTHING_PENDING: &str = "No actions are awaiting approval.";
pub const APPROVAL_PROMPT: &str = "Approve with `.approve`, reject with `.reject`.";
pub const UNKNOWN_COMMAND: &str = "❓ Unknown command. Type `.help` for a list.";

pub fn continuation_limit(limit: u32) -> String {
    format!(
        "⚠️ Stopped after {limit} autonomous steps. Send a message to continue."
    )
}

pub fn safe_mode_status(enabled: bool) -> String {
    if enabled {
        "🔒 Safe mode ON: commands and writes need approval.".to_string()
    } else {
        "🔓 Safe mode OFF: commands and writes run immediately.".to_string()
    }
}

pub fn pinned(path: &str) -> String {
    format!("📌 Pinned `{path}`")
}

pub fn unpinned(path: &str) -> String {
    format!("Unpinned `{path}`")
}

pub fn not_pinned(path: &str) -> String {
    format!("`{path}` is not pinned.")
}

pub fn pin_missing(path: &str) -> String {
    format!("Cannot pin `{path}`: file not found in the working directory.")
}

pub fn pinned_list(paths: &[String]) -> String {
    if paths.is_empty() {
        "No pinned files.".to_string()
    } else {
        let lines: Vec<String> = paths.iter().map(|p| format!("* {p}")).collect();
        format!("Pinned files:\n{}", lines.join("\n"))
    }
}

pub fn usage(command: &str, args: &str) -> String {
    format!("Usage: `.{command} {args}`")
}

pub fn session_banner(root: &str, provider: &str, model: &str, safe_mode: bool) -> String {
    format!(
        "Workbench in {root} ({provider}/{model})\n{}\nType a request, or `.help`.",
        safe_mode_status(safe_mode)
    )
}

pub const HELP: &str = concat!(
    "**Workbench Help**\n",
    "Type a request to talk to the agent, or use: .command _args_\n",
    "\n",
    "**📂 Context**\n",
    "* pin [path]: Include a file in every request\n",
    "* unpin [path]: Stop including a file\n",
    "* pinned: List pinned files\n",
    "* files [subdir]: Show the directory tree\n",
    "\n",
    "**🔒 Approval**\n",
    "* safe on|off: Toggle approval for commands and writes\n",
    "* approve: Run the pending actions\n",
    "* reject: Discard the pending actions\n",
    "\n",
    "**⚡ Misc**\n",
    "* help\n",
    "* quit\n"
);
