//! Context Formatter
//!
//! Pure rendering of a snapshot into the string injected into the turn.
//! Output is bounded: at most [`MAX_EXPLICIT_FACTS`] facts and
//! [`MAX_DEDUCTIVE_INSIGHTS`] insights, plus every peer card line.

use super::ContextSnapshot;

pub const MAX_EXPLICIT_FACTS: usize = 5;
pub const MAX_DEDUCTIVE_INSIGHTS: usize = 3;

const PART_DELIMITER: &str = " | ";
const ITEM_DELIMITER: &str = "; ";

/// Labelled parts of a snapshot, in fixed order, empty sections omitted.
pub fn context_parts(snapshot: &ContextSnapshot) -> Vec<String> {
    let mut parts = Vec::new();

    if !snapshot.explicit_facts.is_empty() {
        let facts: Vec<&str> = snapshot
            .explicit_facts
            .iter()
            .take(MAX_EXPLICIT_FACTS)
            .map(String::as_str)
            .collect();
        parts.push(format!("Relevant facts: {}", facts.join(ITEM_DELIMITER)));
    }

    if !snapshot.deductive_insights.is_empty() {
        let insights: Vec<&str> = snapshot
            .deductive_insights
            .iter()
            .take(MAX_DEDUCTIVE_INSIGHTS)
            .map(|d| d.conclusion.as_str())
            .collect();
        parts.push(format!("Insights: {}", insights.join(ITEM_DELIMITER)));
    }

    if !snapshot.peer_card_lines.is_empty() {
        parts.push(format!(
            "Profile: {}",
            snapshot.peer_card_lines.join(ITEM_DELIMITER)
        ));
    }

    parts
}

/// Join parts under the peer header; empty when there are no parts.
pub fn render_context(peer_name: &str, parts: &[String]) -> String {
    if parts.is_empty() {
        return String::new();
    }
    format!("[Memory for {}]: {}", peer_name, parts.join(PART_DELIMITER))
}

/// Render a snapshot for `peer_name`. An empty string means "inject nothing".
pub fn format_context(peer_name: &str, snapshot: &ContextSnapshot) -> String {
    render_context(peer_name, &context_parts(snapshot))
}
