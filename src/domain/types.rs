//! Core domain types for hook input/output and routing results.

use serde::{Deserialize, Serialize};

/// Processor name reported when no processor produced a result.
pub const UNHANDLED: &str = "none";

/// PreToolUse hook input received from the agent.
#[derive(Debug, Clone, Deserialize)]
pub struct HookInput {
    /// Event name, "PreToolUse" for the events we rewrite
    #[serde(default)]
    pub hook_event_name: Option<String>,

    /// Tool name: "Bash", "Read", "Write", etc.
    #[serde(default)]
    pub tool_name: String,

    /// Tool-specific input
    #[serde(default)]
    pub tool_input: Option<ToolInput>,

    /// Optional session identifier
    #[serde(default)]
    pub session_id: Option<String>,
}

impl HookInput {
    /// Command of a Bash tool invocation, if this is one.
    pub fn bash_command(&self) -> Option<&str> {
        if self.tool_name != "Bash" {
            return None;
        }
        match &self.tool_input {
            Some(ToolInput::Bash(bash)) => Some(bash.command.as_str()),
            _ => None,
        }
    }
}

/// Tool-specific input variants.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ToolInput {
    /// Bash command input
    Bash(BashInput),
    /// Other/unknown tool input
    #[allow(dead_code)]
    Other(serde_json::Value),
}

/// Bash command input.
#[derive(Debug, Clone, Deserialize)]
pub struct BashInput {
    /// Command to execute
    pub command: String,
}

/// Hook output sent back to the agent when a command is rewritten.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOutput {
    pub hook_specific_output: HookSpecificOutput,
}

/// PreToolUse-specific part of the hook output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    pub hook_event_name: String,
    pub permission_decision: String,
    pub updated_input: UpdatedInput,
}

/// Replacement tool input.
#[derive(Debug, Clone, Serialize)]
pub struct UpdatedInput {
    pub command: String,
}

impl HookOutput {
    /// Build an "allow" response that swaps the command for `command`.
    pub fn rewrite(command: String) -> Self {
        Self {
            hook_specific_output: HookSpecificOutput {
                hook_event_name: "PreToolUse".to_string(),
                permission_decision: "allow".to_string(),
                updated_input: UpdatedInput { command },
            },
        }
    }
}

/// SessionStart hook output: a message shown to the user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMessage {
    pub system_message: String,
}

/// Outcome of routing one captured output through the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingResult {
    /// Output after compression (the original when nothing changed)
    pub compressed_output: String,

    /// Name of the processor that produced the output, or "none"
    pub handled_by: String,

    /// Whether `compressed_output` differs from the original
    pub was_modified: bool,
}

impl RoutingResult {
    /// Result produced by a processor.
    pub fn handled(processor: &str, original: &str, compressed: String) -> Self {
        let was_modified = compressed != original;
        Self {
            compressed_output: compressed,
            handled_by: processor.to_string(),
            was_modified,
        }
    }

    /// Result when no processor could produce an output.
    pub fn unhandled(original: &str) -> Self {
        Self {
            compressed_output: original.to_string(),
            handled_by: UNHANDLED.to_string(),
            was_modified: false,
        }
    }

    /// Fraction of bytes saved relative to `original_len`.
    pub fn savings_ratio(&self, original_len: usize) -> f64 {
        if original_len == 0 {
            return 0.0;
        }
        let saved = original_len.saturating_sub(self.compressed_output.len());
        saved as f64 / original_len as f64
    }
}
