// src/config.rs
// Engine configuration: defaults, optional TOML file, env overrides
// (env wins, so deployments can tune single knobs without a file).

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

const ENV_CONFIG_PATH: &str = "ALPHA_WATCH_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/alpha-watch.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Summary endpoint of the discovery service.
    pub summary_url: String,
    /// Periodic sync interval; zero or negative means manual-only.
    pub sync_interval_secs: i64,
    pub fetch_timeout_secs: u64,
    pub alert_ttl_secs: i64,
    pub scroll_period_secs: u64,
    pub scroll_viewport: usize,
    pub top_n: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            summary_url: "http://127.0.0.1:8000/api/v1/dashboard/summary".into(),
            sync_interval_secs: 10,
            fetch_timeout_secs: 8,
            alert_ttl_secs: 5,
            scroll_period_secs: 5,
            scroll_viewport: 5,
            top_n: 10,
        }
    }
}

impl WatchConfig {
    /// Load order: defaults, then `$ALPHA_WATCH_CONFIG` (or
    /// `config/alpha-watch.toml` when present), then env overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
            Self::from_file(Path::new(&path))?
        } else {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                Self::from_file(default_path)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("ALPHA_WATCH_SUMMARY_URL") {
            self.summary_url = url;
        }
        override_parsed("ALPHA_WATCH_SYNC_INTERVAL_SECS", &mut self.sync_interval_secs);
        override_parsed("ALPHA_WATCH_FETCH_TIMEOUT_SECS", &mut self.fetch_timeout_secs);
        override_parsed("ALPHA_WATCH_ALERT_TTL_SECS", &mut self.alert_ttl_secs);
        override_parsed("ALPHA_WATCH_SCROLL_PERIOD_SECS", &mut self.scroll_period_secs);
        override_parsed("ALPHA_WATCH_SCROLL_VIEWPORT", &mut self.scroll_viewport);
        override_parsed("ALPHA_WATCH_TOP_N", &mut self.top_n);
    }

    pub fn sync_interval(&self) -> Duration {
        if self.sync_interval_secs <= 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(self.sync_interval_secs as u64)
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    pub fn scroll_period(&self) -> Duration {
        Duration::from_secs(self.scroll_period_secs.max(1))
    }
}

fn override_parsed<T: std::str::FromStr>(key: &str, slot: &mut T) {
    if let Some(v) = std::env::var(key).ok().and_then(|v| v.parse().ok()) {
        *slot = v;
    }
}
