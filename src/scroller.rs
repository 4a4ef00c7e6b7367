// src/scroller.rs
// Cycles the bounded activity log through a fixed viewport without
// operator input. The state machine itself is synchronous; the cycle
// timer lives in `spawn_cycler` so tests can drive transitions directly.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollPhase {
    /// The whole log fits in the viewport; nothing to cycle.
    Idle,
    /// Advancing one step per cycle tick, wrapping at the end.
    AutoCycling,
    /// An operator holds the viewport; the timer must not move it.
    UserOverride,
}

#[derive(Debug)]
pub struct ActivityAutoScroller {
    viewport: usize,
    len: usize,
    position: usize,
    phase: ScrollPhase,
}

impl ActivityAutoScroller {
    pub fn new(viewport: usize) -> Self {
        Self {
            viewport: viewport.max(1),
            len: 0,
            position: 0,
            phase: ScrollPhase::Idle,
        }
    }

    pub fn phase(&self) -> ScrollPhase {
        self.phase
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn viewport(&self) -> usize {
        self.viewport
    }

    /// Called once per accepted snapshot with the displayed log length.
    /// Enters AutoCycling when the log outgrows the viewport, drops back
    /// to Idle when it no longer does. A paused scroller stays paused;
    /// only the position clamp applies.
    pub fn sync_len(&mut self, len: usize) {
        self.len = len;
        if self.phase != ScrollPhase::UserOverride {
            self.phase = if len > self.viewport {
                ScrollPhase::AutoCycling
            } else {
                ScrollPhase::Idle
            };
        }
        if self.phase == ScrollPhase::Idle {
            self.position = 0;
        } else {
            self.position = self.position.min(self.max_offset());
        }
    }

    /// One cycle tick: advance a step, wrapping to the head after the
    /// last full viewport offset. No-op outside AutoCycling.
    pub fn advance(&mut self) {
        if self.phase != ScrollPhase::AutoCycling {
            return;
        }
        if self.position >= self.max_offset() {
            self.position = 0;
        } else {
            self.position += 1;
        }
    }

    /// New-entries signal from the change detector: jump to the head
    /// immediately instead of waiting for the next cycle tick.
    pub fn reset_to_head(&mut self) {
        self.position = 0;
    }

    /// Operator takes the viewport; the cycle timer stops moving it.
    pub fn pause(&mut self) {
        self.phase = ScrollPhase::UserOverride;
    }

    /// Operator releases the viewport; re-evaluate Idle vs AutoCycling
    /// from the current log length.
    pub fn resume(&mut self) {
        self.phase = if self.len > self.viewport {
            ScrollPhase::AutoCycling
        } else {
            ScrollPhase::Idle
        };
        self.position = self.position.min(self.max_offset());
    }

    /// The contiguous slice of `entries` currently in the viewport.
    pub fn window<'a, T>(&self, entries: &'a [T]) -> &'a [T] {
        let start = self.position.min(entries.len());
        let end = (start + self.viewport).min(entries.len());
        &entries[start..end]
    }

    fn max_offset(&self) -> usize {
        self.len.saturating_sub(self.viewport)
    }
}

/// Spawn the cycle timer: one `advance()` per period.
pub fn spawn_cycler(
    scroller: Arc<Mutex<ActivityAutoScroller>>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first interval tick completes immediately; skip it so the
        // viewport holds the head for one full period after boot.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let mut sc = scroller.lock().expect("scroller mutex poisoned");
            sc.advance();
        }
    })
}
