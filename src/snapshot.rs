// src/snapshot.rs
// Typed model of one aggregate snapshot pulled from the discovery
// service's summary endpoint. Deserialization doubles as schema
// validation: a missing or mistyped field fails the whole snapshot.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Quality grade of a discovered project. Declared ascending so the
/// derived `Ord` ranks `S` highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    C,
    B,
    A,
    S,
}

impl Grade {
    pub const ALL: [Grade; 4] = [Grade::S, Grade::A, Grade::B, Grade::C];

    /// S and A projects qualify for alerting and the high-grade rollup.
    pub fn is_high(self) -> bool {
        matches!(self, Grade::S | Grade::A)
    }

    pub fn letter(self) -> &'static str {
        match self {
            Grade::S => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub team: f64,
    pub tech: f64,
    pub community: f64,
}

/// One ranked/graded project carried inside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectItem {
    pub id: i64,
    pub name: String,
    pub symbol: String,
    pub grade: Grade,
    pub score: f64,
    pub category: String,
    pub blockchain: String,
    #[serde(default, with = "iso8601_opt")]
    pub discovered_at: Option<DateTime<Utc>>,
    /// Set by the source when the project was discovered inside its own
    /// recency window (not by this client).
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub scores: Option<ComponentScores>,
}

/// Aggregate counters reported by the source alongside the item lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_projects: u64,
    pub new_today: u64,
    pub s_grade: u64,
    pub a_grade: u64,
    pub b_grade: u64,
    pub pending: u64,
    pub trending: u64,
    pub total_tvl: f64,
    pub avg_score: f64,
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectWindow {
    pub items: Vec<ProjectItem>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeCount {
    pub grade: Grade,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeTable {
    pub distribution: Vec<GradeCount>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub category: String,
    pub count: u64,
    pub avg_score: f64,
    pub high_grade_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTable {
    pub categories: Vec<CategoryStats>,
    pub total_categories: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    ProjectDiscovered,
    AiAnalysis,
    ProjectReviewed,
    /// Forward-compatible: unrecognized event types are kept, not rejected.
    #[serde(other)]
    Other,
}

/// One typed event in the source's activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub title: String,
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub grade: Option<Grade>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityWindow {
    pub activities: Vec<ActivityEntry>,
    pub count: usize,
}

/// One complete, internally consistent aggregate pull from the source.
/// Immutable once accepted; all derived views are functions of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub stats: DashboardStats,
    pub recent: ProjectWindow,
    pub top_projects: ProjectWindow,
    pub distribution: GradeTable,
    pub categories: CategoryTable,
    pub timeline: ActivityWindow,
    #[serde(with = "iso8601")]
    pub updated_at: DateTime<Utc>,
}

impl Snapshot {
    /// Identities of the recent items; the change detector's comparison set.
    pub fn recent_ids(&self) -> HashSet<i64> {
        self.recent.items.iter().map(|p| p.id).collect()
    }

    /// Timestamp of the newest activity entry, if any.
    pub fn head_activity_ts(&self) -> Option<DateTime<Utc>> {
        self.timeline.activities.first().map(|a| a.timestamp)
    }
}

/// The source emits `datetime.utcnow().isoformat()`-style timestamps,
/// i.e. ISO-8601 with or without an explicit offset. Naive values are
/// taken as UTC.
pub mod iso8601 {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(s: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        s.parse::<NaiveDateTime>()
            .map(|naive| naive.and_utc())
            .map_err(|e| format!("invalid ISO-8601 timestamp {s:?}: {e}"))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.to_rfc3339())
    }
}

/// `Option` counterpart of [`iso8601`], for fields the source omits on
/// some item lists (e.g. `discovered_at` on the top-ranked list).
pub mod iso8601_opt {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => super::iso8601::parse(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }

    pub fn serialize<S>(ts: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match ts {
            Some(ts) => serializer.serialize_some(&ts.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }
}
