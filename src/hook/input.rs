//! Hook input read from stdin.

use crate::error::RecallError;
use crate::types::LocationKey;
use serde::Deserialize;
use std::io::Read;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// Assistant session id; passed through as message metadata.
    #[serde(default)]
    pub session_id: Option<String>,
}

impl HookInput {
    /// Parse the raw stdin payload. Blank input is an empty object.
    pub fn parse(raw: &str) -> Result<Self, RecallError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw).map_err(|e| RecallError::InvalidInput(e.to_string()))
    }

    pub fn from_reader(mut reader: impl Read) -> Result<Self, RecallError> {
        let mut raw = String::new();
        reader
            .read_to_string(&mut raw)
            .map_err(|e| RecallError::InvalidInput(format!("Failed to read stdin: {}", e)))?;
        Self::parse(&raw)
    }

    /// The prompt, unless missing or whitespace only.
    pub fn prompt_text(&self) -> Option<&str> {
        self.prompt.as_deref().filter(|p| !p.trim().is_empty())
    }

    /// Working directory from the input, else the process's.
    pub fn location(&self) -> LocationKey {
        let cwd = match &self.cwd {
            Some(cwd) if !cwd.as_os_str().is_empty() => cwd.clone(),
            _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };
        LocationKey::new(cwd)
    }
}
