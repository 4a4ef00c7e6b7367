//! # Derived Views
//! Pure functions mapping one accepted [`Snapshot`] to the shapes the
//! display layer renders. No I/O, no shared state; deterministic given
//! the snapshot, so the same pull always renders the same screen.

use serde::Serialize;

use crate::snapshot::{ActivityEntry, CategoryStats, Grade, ProjectItem, Snapshot};

/// How many activity entries the display keeps.
pub const ACTIVITY_WINDOW: usize = 10;

/// How many category rows the rollup keeps.
pub const CATEGORY_LIMIT: usize = 8;

/// The first `n` top-ranked items with `rank = index + 1` assigned.
/// The source has already decided the order; it is never re-sorted here.
pub fn top_n(snapshot: &Snapshot, n: usize) -> Vec<ProjectItem> {
    snapshot
        .top_projects
        .items
        .iter()
        .take(n)
        .enumerate()
        .map(|(idx, item)| {
            let mut ranked = item.clone();
            ranked.rank = Some(idx as u32 + 1);
            ranked
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeShare {
    pub grade: Grade,
    pub count: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeBreakdown {
    pub shares: Vec<GradeShare>,
    pub total: u64,
}

/// Count and share of total for each grade S through C.
///
/// Percentages are rounded to one decimal place independently, so they
/// need not sum to exactly 100.0; callers must not renormalize them.
pub fn grade_distribution(snapshot: &Snapshot) -> GradeBreakdown {
    let count_for = |grade: Grade| -> u64 {
        snapshot
            .distribution
            .distribution
            .iter()
            .filter(|row| row.grade == grade)
            .map(|row| row.count)
            .sum()
    };

    let counts: Vec<(Grade, u64)> = Grade::ALL.iter().map(|&g| (g, count_for(g))).collect();
    let total: u64 = counts.iter().map(|(_, c)| c).sum();

    let shares = counts
        .into_iter()
        .map(|(grade, count)| {
            let percent = if total > 0 {
                round1(count as f64 / total as f64 * 100.0)
            } else {
                0.0
            };
            GradeShare {
                grade,
                count,
                percent,
            }
        })
        .collect();

    GradeBreakdown { shares, total }
}

/// Category rows sorted by project count descending, truncated to the
/// [`CATEGORY_LIMIT`] largest for display.
pub fn category_rollup(snapshot: &Snapshot) -> Vec<CategoryStats> {
    let mut rows = snapshot.categories.categories.clone();
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows.truncate(CATEGORY_LIMIT);
    rows
}

/// The activity log truncated to [`ACTIVITY_WINDOW`] entries. The source
/// already orders it newest-first; the order is preserved as-is.
pub fn activity_log(snapshot: &Snapshot) -> &[ActivityEntry] {
    let activities = &snapshot.timeline.activities;
    &activities[..activities.len().min(ACTIVITY_WINDOW)]
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
