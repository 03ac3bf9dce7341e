use crate::captions::clock::{Clock, SystemClock};
use crate::captions::entry::{CaptionEntry, CaptionLine, EnqueueOutcome, SweepReport};
use crate::captions::sweeper::Sweeper;
use crate::config::CaptionConfig;
use crate::prelude::{CaptionResult, CaptionSink, SchedulerError};
use crate::telemetry::metrics::{MetricsRecorder, MetricsSnapshot};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Entries plus the dedup ledger. Both live behind one lock so the ledger
/// check and the list scan see the same state.
#[derive(Default)]
struct QueueState {
    entries: Vec<CaptionEntry>,
    ledger: HashMap<String, Instant>,
}

impl QueueState {
    /// The only place entries are added or matched by key, which keeps the
    /// list free of duplicate keys.
    fn upsert(
        &mut self,
        key: Option<&str>,
        text: String,
        show_at: Instant,
        now: Instant,
    ) -> EnqueueOutcome {
        if let Some(key) = key {
            if let Some(entry) = self
                .entries
                .iter_mut()
                .find(|entry| entry.dedup_key.as_deref() == Some(key))
            {
                entry.text = text;
                entry.show_at = show_at;
                return EnqueueOutcome::Refreshed;
            }
        }
        self.entries.push(CaptionEntry::new(
            text,
            key.map(str::to_owned),
            show_at,
            now,
        ));
        EnqueueOutcome::Inserted
    }
}

fn in_cooldown(
    ledger: &HashMap<String, Instant>,
    key: Option<&str>,
    now: Instant,
    cooldown: Duration,
) -> bool {
    key.and_then(|key| ledger.get(key))
        .is_some_and(|last| now.saturating_duration_since(*last) < cooldown)
}

/// Linear ramp from 1 to 0 across the last `window` before `expiration`.
fn fade_alpha(age: Duration, expiration: Duration, window: Duration) -> f32 {
    if window.is_zero() {
        return if age >= expiration { 0.0 } else { 1.0 };
    }
    let fade_start = expiration.saturating_sub(window);
    if age <= fade_start {
        return 1.0;
    }
    let progress = (age - fade_start).as_secs_f32() / window.as_secs_f32();
    (1.0 - progress).clamp(0.0, 1.0)
}

fn delay_from_seconds(seconds: f32) -> Duration {
    if seconds.is_finite() && seconds > 0.0 {
        Duration::try_from_secs_f32(seconds).unwrap_or(Duration::ZERO)
    } else {
        Duration::ZERO
    }
}

/// State shared between the scheduler handle and its sweep thread.
pub(crate) struct Shared {
    state: Mutex<QueueState>,
    config: CaptionConfig,
    clock: Arc<dyn Clock>,
    metrics: MetricsRecorder,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("caption state lock poisoned by a panicking producer; recovering");
                self.state.clear_poison();
                poisoned.into_inner()
            }
        }
    }

    /// Visible or pending, or kept alive by a repeat inside the cooldown.
    fn is_live(
        &self,
        ledger: &HashMap<String, Instant>,
        entry: &CaptionEntry,
        now: Instant,
    ) -> bool {
        entry.age(now) <= self.config.expiration()
            || in_cooldown(
                ledger,
                entry.dedup_key.as_deref(),
                now,
                self.config.dedup_cooldown(),
            )
    }

    fn alpha(&self, ledger: &HashMap<String, Instant>, entry: &CaptionEntry, now: Instant) -> f32 {
        if !self.config.fading_enabled {
            return 1.0;
        }
        if self.config.dedup_enabled
            && in_cooldown(
                ledger,
                entry.dedup_key.as_deref(),
                now,
                self.config.dedup_cooldown(),
            )
        {
            return 1.0;
        }
        fade_alpha(
            entry.age(now),
            self.config.expiration(),
            self.config.fade_window(),
        )
    }

    pub(crate) fn sweep(&self) -> SweepReport {
        let now = self.clock.now();
        let stale_after = self.config.ledger_stale_after();
        let report = {
            let mut guard = self.lock_state();
            let state = &mut *guard;

            let entries_before = state.entries.len();
            let ledger = &state.ledger;
            state.entries.retain(|entry| self.is_live(ledger, entry, now));

            let keys_before = state.ledger.len();
            state
                .ledger
                .retain(|_, last| now.saturating_duration_since(*last) <= stale_after);

            SweepReport {
                removed: entries_before - state.entries.len(),
                pruned_keys: keys_before - state.ledger.len(),
            }
        };
        self.metrics.record_expired(report.removed);
        report
    }
}

/// Time-windowed caption queue with repeat suppression and fade-out.
///
/// Producers may call [`enqueue`](Self::enqueue) from any thread; the
/// renderer calls [`snapshot`](Self::snapshot) once per frame. Expired entries
/// are removed by [`sweep`](Self::sweep), either on demand or by the
/// background sweeper started with [`start_sweeper`](Self::start_sweeper).
pub struct CaptionScheduler {
    shared: Arc<Shared>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl CaptionScheduler {
    pub fn new(config: CaptionConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Like [`new`](Self::new), but rejects an invalid configuration.
    pub fn validated(config: CaptionConfig) -> CaptionResult<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn with_clock(config: CaptionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                config,
                clock,
                metrics: MetricsRecorder::new(),
            }),
            sweeper: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &CaptionConfig {
        &self.shared.config
    }

    /// Submits a caption to appear after `delay_seconds`.
    ///
    /// Keyed captions seen again within the cooldown are discarded when
    /// repeat suppression is on; otherwise the existing entry with that key is
    /// refreshed in place.
    pub fn enqueue(
        &self,
        text: impl Into<String>,
        dedup_key: Option<&str>,
        delay_seconds: f32,
    ) -> EnqueueOutcome {
        let text = text.into();
        if text.trim().is_empty() {
            self.shared.metrics.record_enqueue(EnqueueOutcome::Ignored);
            return EnqueueOutcome::Ignored;
        }

        let config = &self.shared.config;
        let now = self.shared.clock.now();
        let delay = delay_from_seconds(delay_seconds);
        let show_at = now.checked_add(delay).unwrap_or(now);

        let outcome = {
            let mut state = self.shared.lock_state();
            match dedup_key {
                Some(key)
                    if config.dedup_enabled
                        && in_cooldown(&state.ledger, Some(key), now, config.dedup_cooldown()) =>
                {
                    EnqueueOutcome::Suppressed
                }
                Some(key) => {
                    state.ledger.insert(key.to_owned(), now);
                    state.upsert(Some(key), text, show_at, now)
                }
                None => state.upsert(None, text, show_at, now),
            }
        };

        if outcome == EnqueueOutcome::Suppressed {
            debug!("suppressed repeat caption for key {:?}", dedup_key);
        }
        self.shared.metrics.record_enqueue(outcome);
        outcome
    }

    /// Up to `max_visible` shown captions, oldest first, with their opacity.
    pub fn snapshot(&self, max_visible: usize) -> Vec<CaptionLine> {
        if max_visible == 0 {
            return Vec::new();
        }
        let now = self.shared.clock.now();
        let state = self.shared.lock_state();

        let mut visible: Vec<&CaptionEntry> = state
            .entries
            .iter()
            .filter(|entry| entry.is_shown(now) && self.shared.is_live(&state.ledger, entry, now))
            .collect();
        visible.sort_by_key(|entry| entry.show_at);

        let start = visible.len().saturating_sub(max_visible);
        visible[start..]
            .iter()
            .map(|entry| CaptionLine {
                alpha: self.shared.alpha(&state.ledger, entry, now),
                text: entry.text.clone(),
            })
            .collect()
    }

    /// Removes expired entries and forgets stale ledger keys.
    pub fn sweep(&self) -> SweepReport {
        self.shared.sweep()
    }

    /// Drops all entries and ledger state.
    pub fn clear(&self) {
        let mut state = self.shared.lock_state();
        state.entries.clear();
        state.ledger.clear();
    }

    pub fn len(&self) -> usize {
        self.shared.lock_state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Starts the periodic background sweep at the configured interval.
    pub fn start_sweeper(&self) -> Result<(), SchedulerError> {
        let mut slot = self
            .sweeper
            .lock()
            .map_err(|_| SchedulerError::Poisoned)?;
        if slot.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }
        *slot = Some(Sweeper::spawn(
            self.shared.clone(),
            self.shared.config.sweep_interval(),
        )?);
        Ok(())
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    /// Stops the background sweep and waits for its thread to exit.
    pub fn shutdown(&self) {
        let sweeper = match self.sweeper.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(mut sweeper) = sweeper {
            sweeper.stop();
        }
    }
}

impl CaptionSink for CaptionScheduler {
    fn submit(&self, text: &str, dedup_key: Option<&str>, delay_seconds: f32) -> EnqueueOutcome {
        self.enqueue(text, dedup_key, delay_seconds)
    }
}

impl Drop for CaptionScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captions::clock::ManualClock;
    use crate::config::ConfigError;
    use crate::prelude::CaptionError;
    use std::collections::HashSet;
    use std::thread;

    fn scheduler(config: CaptionConfig) -> (CaptionScheduler, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (CaptionScheduler::with_clock(config, clock.clone()), clock)
    }

    fn texts(lines: &[CaptionLine]) -> Vec<&str> {
        lines.iter().map(|line| line.text.as_str()).collect()
    }

    fn fading() -> CaptionConfig {
        CaptionConfig {
            expiration_ms: 5_000,
            dedup_cooldown_ms: 5_000,
            fade_window_ms: 2_000,
            fading_enabled: true,
            ..Default::default()
        }
    }

    #[test]
    fn blank_text_is_ignored() {
        let (captions, _) = scheduler(CaptionConfig::default());
        assert_eq!(captions.enqueue("   ", None, 0.0), EnqueueOutcome::Ignored);
        assert_eq!(captions.enqueue("", Some("k"), 0.0), EnqueueOutcome::Ignored);
        assert!(captions.is_empty());
    }

    #[test]
    fn repeat_within_cooldown_is_suppressed() {
        let (captions, clock) = scheduler(CaptionConfig::default());
        assert_eq!(captions.enqueue("X", Some("k"), 0.0), EnqueueOutcome::Inserted);
        assert_eq!(captions.enqueue("Y", Some("k"), 0.0), EnqueueOutcome::Suppressed);
        assert_eq!(texts(&captions.snapshot(4)), vec!["X"]);

        clock.advance(captions.config().dedup_cooldown());
        assert_eq!(captions.enqueue("Y", Some("k"), 0.0), EnqueueOutcome::Refreshed);
        assert_eq!(texts(&captions.snapshot(4)), vec!["Y"]);
        assert_eq!(captions.len(), 1);
    }

    #[test]
    fn keyed_repeat_without_suppression_updates_in_place() {
        let (captions, _) = scheduler(CaptionConfig {
            dedup_enabled: false,
            ..Default::default()
        });
        captions.enqueue("first", None, 0.0);
        captions.enqueue("X", Some("k"), 0.0);
        assert_eq!(captions.enqueue("Y", Some("k"), 0.0), EnqueueOutcome::Refreshed);
        assert_eq!(texts(&captions.snapshot(4)), vec!["first", "Y"]);
        assert_eq!(captions.len(), 2);
    }

    #[test]
    fn entries_expire_from_snapshot_and_sweep() {
        let (captions, clock) = scheduler(CaptionConfig::default());
        captions.enqueue("door opens", None, 0.0);

        clock.advance(captions.config().expiration());
        assert_eq!(captions.snapshot(4).len(), 1);
        assert_eq!(captions.sweep().removed, 0);

        clock.advance(Duration::from_millis(1));
        assert!(captions.snapshot(4).is_empty());
        assert_eq!(captions.sweep().removed, 1);
        assert!(captions.is_empty());
        assert_eq!(captions.metrics().expired, 1);
    }

    #[test]
    fn alpha_fades_only_in_final_window() {
        let (captions, clock) = scheduler(fading());
        captions.enqueue("steps", None, 0.0);

        for ms in (0..=3_000).step_by(500) {
            clock.set_elapsed(Duration::from_millis(ms));
            assert_eq!(captions.snapshot(1)[0].alpha, 1.0, "age {ms}ms");
        }

        let mut previous = 1.0;
        for ms in (3_100..=5_000).step_by(100) {
            clock.set_elapsed(Duration::from_millis(ms));
            let alpha = captions.snapshot(1)[0].alpha;
            assert!(alpha < previous, "age {ms}ms: {alpha} !< {previous}");
            previous = alpha;
        }
        assert_eq!(previous, 0.0);

        clock.set_elapsed(Duration::from_millis(4_000));
        assert!((captions.snapshot(1)[0].alpha - 0.5).abs() < 1e-4);
    }

    #[test]
    fn keyed_caption_fades_with_default_timings() {
        let (captions, clock) = scheduler(CaptionConfig {
            fading_enabled: true,
            ..Default::default()
        });
        captions.enqueue("door opens", Some("door"), 0.0);
        let alpha_at = |ms: u64| {
            clock.set_elapsed(Duration::from_millis(ms));
            captions.snapshot(1)[0].alpha
        };

        assert_eq!(alpha_at(0), 1.0);
        assert_eq!(alpha_at(3_000), 1.0);
        assert!((alpha_at(4_000) - 0.5).abs() < 1e-4);

        let mut previous = 1.0;
        for ms in (3_100..=5_000).step_by(100) {
            let alpha = alpha_at(ms);
            assert!(alpha < previous, "age {ms}ms: {alpha} !< {previous}");
            previous = alpha;
        }
        assert_eq!(previous, 0.0);
    }

    #[test]
    fn active_cooldown_freezes_alpha() {
        let (captions, clock) = scheduler(fading());
        captions.enqueue("engine hum", Some("engine"), 0.0);
        clock.advance(Duration::from_millis(4_000));
        assert_eq!(captions.snapshot(1)[0].alpha, 1.0);

        let (short, clock) = scheduler(CaptionConfig {
            dedup_cooldown_ms: 1_000,
            ..fading()
        });
        short.enqueue("engine hum", Some("engine"), 0.0);
        clock.advance(Duration::from_millis(4_000));
        assert!((short.snapshot(1)[0].alpha - 0.5).abs() < 1e-4);
    }

    #[test]
    fn snapshot_keeps_most_recent_in_show_order() {
        let (captions, clock) = scheduler(CaptionConfig::default());
        for text in ["a", "b", "c", "d", "e"] {
            captions.enqueue(text, None, 0.0);
            clock.advance(Duration::from_millis(100));
        }
        assert_eq!(texts(&captions.snapshot(3)), vec!["c", "d", "e"]);
        assert!(captions.snapshot(0).is_empty());
    }

    #[test]
    fn ties_keep_insertion_order() {
        let (captions, _) = scheduler(CaptionConfig::default());
        captions.enqueue("first", None, 0.0);
        captions.enqueue("second", None, 0.0);
        assert_eq!(texts(&captions.snapshot(4)), vec!["first", "second"]);
    }

    #[test]
    fn delayed_entries_wait_for_show_time() {
        let (captions, clock) = scheduler(CaptionConfig::default());
        captions.enqueue("later line", None, 1.5);
        captions.enqueue("now line", None, 0.0);
        captions.enqueue("bad delay", None, f32::NAN);
        assert_eq!(texts(&captions.snapshot(4)), vec!["now line", "bad delay"]);

        clock.advance(Duration::from_millis(1_500));
        assert_eq!(
            texts(&captions.snapshot(4)),
            vec!["now line", "bad delay", "later line"]
        );
    }

    #[test]
    fn cooldown_keeps_entry_alive_past_expiration() {
        let (captions, clock) = scheduler(CaptionConfig {
            expiration_ms: 2_000,
            dedup_cooldown_ms: 10_000,
            fade_window_ms: 1_000,
            ..Default::default()
        });
        captions.enqueue("alarm", Some("alarm"), 0.0);

        clock.advance(Duration::from_secs(3));
        assert_eq!(captions.sweep(), SweepReport::default());
        assert_eq!(texts(&captions.snapshot(4)), vec!["alarm"]);

        clock.advance(Duration::from_secs(8));
        assert_eq!(captions.sweep().removed, 1);

        clock.advance(Duration::from_secs(31));
        assert_eq!(captions.sweep().pruned_keys, 1);
        assert_eq!(captions.enqueue("alarm", Some("alarm"), 0.0), EnqueueOutcome::Inserted);
    }

    #[test]
    fn validated_rejects_bad_config() {
        let config = CaptionConfig {
            max_visible_lines: 0,
            ..CaptionConfig::default()
        };
        assert!(matches!(
            CaptionScheduler::validated(config),
            Err(CaptionError::Config(ConfigError::NoVisibleLines))
        ));
        assert!(CaptionScheduler::validated(CaptionConfig::default()).is_ok());
    }

    #[test]
    fn clear_drops_entries_and_ledger() {
        let (captions, _) = scheduler(CaptionConfig::default());
        captions.enqueue("X", Some("k"), 0.0);
        captions.clear();
        assert!(captions.is_empty());
        assert_eq!(captions.enqueue("X", Some("k"), 0.0), EnqueueOutcome::Inserted);
    }

    #[test]
    fn concurrent_producers_never_duplicate_keys() {
        let (captions, _) = scheduler(CaptionConfig::default());
        let captions = Arc::new(captions);

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let captions = captions.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        let key = format!("k{}", i % 10);
                        captions.enqueue(format!("sound {i}"), Some(&key), 0.0);
                        if i % 25 == 0 {
                            captions.enqueue(format!("relay {worker}-{i}"), None, 0.0);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let lines = captions.snapshot(usize::MAX);
        let keyed: HashSet<&str> = lines
            .iter()
            .filter(|line| line.text.starts_with("sound"))
            .map(|line| line.text.as_str())
            .collect();
        assert_eq!(keyed.len(), 10);
        assert_eq!(captions.len(), 10 + 8 * 4);
        assert_eq!(captions.metrics().suppressed, 8 * 100 - 10);
    }

    #[test]
    fn background_sweeper_removes_expired_entries() {
        let (captions, clock) = scheduler(CaptionConfig {
            sweep_interval_ms: 10,
            ..Default::default()
        });
        captions.enqueue("gone soon", None, 0.0);
        captions.start_sweeper().unwrap();
        assert!(captions.is_sweeping());
        assert!(matches!(
            captions.start_sweeper(),
            Err(SchedulerError::AlreadyRunning)
        ));

        clock.advance(Duration::from_secs(6));
        let mut waited = 0;
        while !captions.is_empty() && waited < 200 {
            thread::sleep(Duration::from_millis(10));
            waited += 1;
        }
        assert!(captions.is_empty());

        captions.shutdown();
        assert!(!captions.is_sweeping());
        captions.start_sweeper().unwrap();
    }

    #[test]
    fn fade_alpha_handles_zero_window() {
        let exp = Duration::from_secs(5);
        assert_eq!(fade_alpha(Duration::from_secs(4), exp, Duration::ZERO), 1.0);
        assert_eq!(fade_alpha(exp, exp, Duration::ZERO), 0.0);
    }
}
