// src/alerts.rs
// In-process alert dispatch for newly discovered high-grade projects.
// One dismissible alert per qualifying item per detection event, with
// fixed auto-expiry. Time is passed in explicitly so the lifecycle is
// testable without a running clock.

use std::sync::Mutex;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::{counter, gauge};
use serde::Serialize;

use crate::snapshot::{iso8601, Grade, ProjectItem};

/// An ephemeral notification keyed by project identity. Destroyed by
/// explicit dismissal or by reaching `expires_at`, whichever comes first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub project_id: i64,
    pub name: String,
    pub symbol: String,
    pub grade: Grade,
    pub score: f64,
    pub category: String,
    pub blockchain: String,
    #[serde(with = "iso8601")]
    pub opened_at: DateTime<Utc>,
    #[serde(with = "iso8601")]
    pub expires_at: DateTime<Utc>,
    /// Stable navigation target for the "view details" action.
    pub detail_path: String,
}

pub struct AlertCenter {
    ttl: ChronoDuration,
    inner: Mutex<Vec<Alert>>,
}

impl AlertCenter {
    /// `ttl_secs` < 0 is treated as 0 (alerts expire immediately).
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            ttl: ChronoDuration::seconds(ttl_secs.max(0)),
            inner: Mutex::new(Vec::new()),
        }
    }

    /// Open one alert per S/A-grade item in `fresh`. An identity already
    /// present in the active set is skipped, so one detection event can
    /// never duplicate an alert; a later detection event for the same
    /// identity (after dismissal or expiry) opens a new one.
    ///
    /// Returns the number of alerts opened.
    pub fn open_batch(&self, fresh: &[ProjectItem], now: DateTime<Utc>) -> usize {
        let mut alerts = self.inner.lock().expect("alert center mutex poisoned");
        Self::prune(&mut alerts, now);

        let mut opened = 0usize;
        for item in fresh.iter().filter(|p| p.grade.is_high()) {
            if alerts.iter().any(|a| a.project_id == item.id) {
                continue;
            }
            alerts.push(Alert {
                project_id: item.id,
                name: item.name.clone(),
                symbol: item.symbol.clone(),
                grade: item.grade,
                score: item.score,
                category: item.category.clone(),
                blockchain: item.blockchain.clone(),
                opened_at: now,
                expires_at: now + self.ttl,
                detail_path: format!("/projects/{}", item.id),
            });
            opened += 1;
        }

        if opened > 0 {
            counter!("alerts_opened_total").increment(opened as u64);
        }
        gauge!("alerts_active").set(alerts.len() as f64);
        opened
    }

    /// Currently visible alerts, oldest first. Expired ones are pruned
    /// before returning, so expiry needs no dedicated timer task.
    pub fn active(&self, now: DateTime<Utc>) -> Vec<Alert> {
        let mut alerts = self.inner.lock().expect("alert center mutex poisoned");
        Self::prune(&mut alerts, now);
        gauge!("alerts_active").set(alerts.len() as f64);
        alerts.clone()
    }

    /// Remove one alert immediately regardless of remaining lifetime.
    /// Returns whether it was present.
    pub fn dismiss(&self, project_id: i64, now: DateTime<Utc>) -> bool {
        let mut alerts = self.inner.lock().expect("alert center mutex poisoned");
        Self::prune(&mut alerts, now);
        let before = alerts.len();
        alerts.retain(|a| a.project_id != project_id);
        let dismissed = alerts.len() < before;
        if dismissed {
            counter!("alerts_dismissed_total").increment(1);
        }
        gauge!("alerts_active").set(alerts.len() as f64);
        dismissed
    }

    /// Drop expired alerts; run on every scheduler tick. Returns how
    /// many were dropped.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut alerts = self.inner.lock().expect("alert center mutex poisoned");
        let expired = Self::prune(&mut alerts, now);
        gauge!("alerts_active").set(alerts.len() as f64);
        expired
    }

    fn prune(alerts: &mut Vec<Alert>, now: DateTime<Utc>) -> usize {
        let before = alerts.len();
        alerts.retain(|a| a.expires_at > now);
        let expired = before - alerts.len();
        if expired > 0 {
            counter!("alerts_expired_total").increment(expired as u64);
        }
        expired
    }
}
