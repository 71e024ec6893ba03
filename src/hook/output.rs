//! Hook output written to stdout.

use crate::error::RecallError;
use serde::Serialize;

pub const USER_PROMPT_SUBMIT_EVENT: &str = "UserPromptSubmit";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    pub hook_event_name: String,
    pub additional_context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOutput {
    pub hook_specific_output: HookSpecificOutput,
}

impl HookOutput {
    /// Output injecting `context` into the current turn; `None` for empty context.
    pub fn additional_context(context: String) -> Option<Self> {
        if context.is_empty() {
            return None;
        }
        Some(Self {
            hook_specific_output: HookSpecificOutput {
                hook_event_name: USER_PROMPT_SUBMIT_EVENT.to_string(),
                additional_context: context,
            },
        })
    }

    pub fn context(&self) -> &str {
        &self.hook_specific_output.additional_context
    }

    /// Single-line JSON, without trailing newline.
    pub fn to_json_line(&self) -> Result<String, RecallError> {
        serde_json::to_string(self)
            .map_err(|e| RecallError::InvalidInput(format!("Failed to encode hook output: {}", e)))
    }
}
