/// A builder for rendering prompts with context.
pub struct PromptRenderer<'a> {
    template: &'a str,
    replacements: Vec<(&'a str, String)>,
}

impl<'a> PromptRenderer<'a> {
    pub fn new(template: &'a str) -> Self {
        Self {
            template,
            replacements: Vec::new(),
        }
    }

    pub fn set(mut self, key: &'a str, value: impl Into<String>) -> Self {
        self.replacements.push((key, value.into()));
        self
    }

    pub fn render(self) -> String {
        let mut result = self.template.to_string();
        for (key, value) in self.replacements {
            result = result.replace(key, &value);
        }

        // Any {{...}} left over is a template bug
        if let Some(start) = result.find("{{") {
            if let Some(end) = result[start..].find("}}") {
                let placeholder = &result[start..start + end + 2];
                tracing::error!("Workbench: [PROMPT RENDER ERROR] Unreplaced placeholder found in output: {}", placeholder);
            }
        }

        result
    }
}

pub const SYSTEM_TEMPLATE: &str = include_str!("../../prompts/system.md");

/// System instruction with the capability catalog filled in.
pub fn system_prompt(tool_catalog: &str) -> String {
    PromptRenderer::new(SYSTEM_TEMPLATE)
        .set("{{TOOLS}}", tool_catalog)
        .render()
}

/// Workspace snapshot sent with every request. `pinned` holds (path, content) pairs.
pub fn build_context(root: &str, tree: &str, pinned: &[(String, String)]) -> String {
    let mut context = format!(
        "Current Working Directory: {}\nDirectory Structure:\n{}\n",
        root, tree
    );
    if !pinned.is_empty() {
        context.push_str("\nPINNED FILES:\n");
        for (path, content) in pinned {
            context.push_str(&format!(
                "--- {path} ---\n{content}\n--- End of {path} ---\n"
            ));
        }
    }
    context
}

pub fn request_prompt(context: &str, request: &str) -> String {
    format!("CONTEXT:\n{}\n\nUSER REQUEST:\n{}", context, request)
}

/// Follow-up message carrying a batch's output back to the oracle.
pub fn execution_result(output: &str) -> String {
    format!(
        "System Execution Result:\n{}\n\nProceed with the next step.",
        output
    )
}

/// Assistant turn as shown in the transcript.
pub fn assistant_turn(thought: &str, response: &str) -> String {
    if thought.is_empty() {
        response.to_string()
    } else {
        format!("_{}_\n\n{}", thought, response)
    }
}
