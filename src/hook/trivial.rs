//! Prompts not worth a context lookup.
//!
//! Affirmations, slash commands and very short prompts rarely benefit from
//! injected memory, so they skip the context decision entirely.

/// Prompts shorter than this many characters are trivial.
pub const MIN_CONTEXT_PROMPT_CHARS: usize = 20;

const AFFIRMATIONS: &[&str] = &[
    "yes", "no", "ok", "sure", "thanks", "y", "n", "yep", "nope", "yeah", "nah", "continue",
    "go ahead", "do it", "proceed",
];

pub fn is_trivial_prompt(prompt: &str) -> bool {
    let trimmed = prompt.trim();
    if trimmed.starts_with('/') {
        return true;
    }
    if trimmed.chars().count() < MIN_CONTEXT_PROMPT_CHARS {
        return true;
    }
    let lower = trimmed.to_lowercase();
    AFFIRMATIONS.contains(&lower.as_str())
}
