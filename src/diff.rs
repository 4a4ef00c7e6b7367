// src/diff.rs
// Change detection between the previously accepted snapshot and an
// incoming one. Pure functions; the scheduler owns the bookkeeping.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::snapshot::{ActivityEntry, ProjectItem};

/// Returns, in incoming order, the items the source flags as newly
/// discovered whose identity was not present in the previous snapshot.
///
/// `previous = None` means this is the first snapshot of the session:
/// nothing is treated as new regardless of flags, so a fresh session
/// cannot open a storm of alerts for items the source still flags from
/// its own recency window.
pub fn new_items(previous: Option<&HashSet<i64>>, incoming: &[ProjectItem]) -> Vec<ProjectItem> {
    let Some(previous) = previous else {
        return Vec::new();
    };
    incoming
        .iter()
        .filter(|item| item.is_new && !previous.contains(&item.id))
        .cloned()
        .collect()
}

/// True when the newest activity entry is strictly newer than the head
/// observed at the previous accepted snapshot. False on first load.
pub fn timeline_advanced(
    previous_head: Option<DateTime<Utc>>,
    timeline: &[ActivityEntry],
) -> bool {
    match (previous_head, timeline.first()) {
        (Some(prev), Some(head)) => head.timestamp > prev,
        _ => false,
    }
}
