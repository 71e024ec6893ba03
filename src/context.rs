//! Context snapshot, cache and refresh policy.
//!
//! A [`ContextSnapshot`] is the materialized answer to "what does the memory
//! service know about this peer". It is replaced wholesale on every
//! successful fetch and reused until the [`policy`] says it must be refetched.

pub mod cache;
pub mod format;
pub mod policy;

use crate::remote::PeerContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use cache::{ContextCache, RefreshPolicyState, RefreshSettings};
pub use format::{format_context, render_context};
pub use policy::{refresh_reason, should_fetch, RefreshReason};

/// An inferred conclusion together with what it was inferred from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductiveInsight {
    pub conclusion: String,
    #[serde(default)]
    pub premises: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    #[serde(default)]
    pub explicit_facts: Vec<String>,
    #[serde(default)]
    pub deductive_insights: Vec<DeductiveInsight>,
    #[serde(default)]
    pub peer_card_lines: Vec<String>,
    pub fetched_at: DateTime<Utc>,
}

impl ContextSnapshot {
    pub fn empty(fetched_at: DateTime<Utc>) -> Self {
        Self {
            explicit_facts: Vec::new(),
            deductive_insights: Vec::new(),
            peer_card_lines: Vec::new(),
            fetched_at,
        }
    }

    /// Normalize a remote context payload; blank entries are dropped.
    pub fn from_remote(context: PeerContext, fetched_at: DateTime<Utc>) -> Self {
        let mut snapshot = Self::empty(fetched_at);

        if let Some(representation) = context.representation {
            snapshot.explicit_facts = representation
                .explicit
                .iter()
                .filter_map(|e| e.content())
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
            snapshot.deductive_insights = representation
                .deductive
                .into_iter()
                .filter_map(|d| {
                    let conclusion = d.conclusion?.trim().to_string();
                    if conclusion.is_empty() {
                        return None;
                    }
                    Some(DeductiveInsight {
                        conclusion,
                        premises: d.premises,
                    })
                })
                .collect();
        }

        snapshot.peer_card_lines = context
            .peer_card
            .unwrap_or_default()
            .into_iter()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();

        snapshot
    }

    pub fn is_empty(&self) -> bool {
        self.explicit_facts.is_empty()
            && self.deductive_insights.is_empty()
            && self.peer_card_lines.is_empty()
    }
}
