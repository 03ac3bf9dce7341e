use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// A caption held by the scheduler.
#[derive(Debug, Clone)]
pub struct CaptionEntry {
    pub text: String,
    pub dedup_key: Option<String>,
    pub show_at: Instant,
    pub inserted_at: Instant,
}

impl CaptionEntry {
    pub fn new(text: String, dedup_key: Option<String>, show_at: Instant, now: Instant) -> Self {
        Self {
            text,
            dedup_key,
            show_at,
            inserted_at: now,
        }
    }

    pub fn is_shown(&self, now: Instant) -> bool {
        self.show_at <= now
    }

    /// Time since the entry became visible; zero while pending.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.show_at)
    }
}

/// One rendered line returned by a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionLine {
    /// Opacity in `[0, 1]`.
    pub alpha: f32,
    pub text: String,
}

/// What `enqueue` did with a caption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Blank text; nothing happened.
    Ignored,
    Inserted,
    /// An entry with the same key was updated in place.
    Refreshed,
    /// Same key seen inside the cooldown window; discarded.
    Suppressed,
}

/// Result of one sweep pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    pub removed: usize,
    pub pruned_keys: usize,
}
