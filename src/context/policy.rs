//! Refresh decision.
//!
//! Two independent triggers force a fetch: the snapshot is older than the
//! staleness window, or enough prompts went by since the last refresh. The
//! count trigger covers bursts of prompts inside one staleness window.

/// Why the cached snapshot cannot be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    Missing,
    Stale,
    Threshold,
}

impl RefreshReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshReason::Missing => "missing",
            RefreshReason::Stale => "stale",
            RefreshReason::Threshold => "threshold",
        }
    }
}

/// First trigger that applies, in the order missing, stale, threshold.
pub fn refresh_reason(
    has_snapshot: bool,
    is_stale: bool,
    force_refresh: bool,
) -> Option<RefreshReason> {
    if !has_snapshot {
        Some(RefreshReason::Missing)
    } else if is_stale {
        Some(RefreshReason::Stale)
    } else if force_refresh {
        Some(RefreshReason::Threshold)
    } else {
        None
    }
}

pub fn should_fetch(has_snapshot: bool, is_stale: bool, force_refresh: bool) -> bool {
    refresh_reason(has_snapshot, is_stale, force_refresh).is_some()
}
