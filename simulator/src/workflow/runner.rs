use crate::format::{CaptionFormatter, FormattedSink};
use crate::relay::{PeerId, RelayHub};
use crate::workflow::config::{EventKind, RolloffSpec, ScenarioConfig, ScenarioEvent};
use anyhow::Context;
use captioncore::captions::{CaptionLine, CaptionScheduler, ManualClock};
use captioncore::math::Vec3;
use captioncore::prelude::RecognitionHook;
use captioncore::spatial::{EmitterPose, SpatialAnalyzer};
use captioncore::telemetry::{LogManager, MetricsSnapshot};
use captioncore::CaptionSink;
use log::debug;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Peer id of the player whose screen the replay renders.
pub const LOCAL_PEER: PeerId = 0;

/// Rendered lines at one tick.
#[derive(Debug, Clone)]
pub struct Frame {
    pub at_ms: u64,
    pub lines: Vec<CaptionLine>,
}

pub struct ReplayResult {
    pub frames: Vec<Frame>,
    pub metrics: MetricsSnapshot,
    /// Deliveries made through the relay hub.
    pub relayed: usize,
    pub uncaptioned: usize,
    pub inaudible: usize,
    /// Captions inserted on each remote peer's screen.
    pub remote_inserted: BTreeMap<PeerId, usize>,
}

#[derive(Default)]
struct SoundTally {
    uncaptioned: usize,
    inaudible: usize,
}

/// Scheduler, formatter and relay wiring for one replay.
struct Session {
    clock: Arc<ManualClock>,
    local: Arc<CaptionScheduler>,
    formatter: Arc<CaptionFormatter>,
    hub: Arc<RelayHub>,
    hook: RecognitionHook,
    remotes: Vec<(PeerId, Arc<CaptionScheduler>)>,
    relayed: Arc<AtomicUsize>,
    log: LogManager,
    tally: SoundTally,
}

/// Clip names arrive as file names; captions are keyed by the bare stem.
fn clip_name(clip: &str) -> &str {
    Path::new(clip)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(clip)
}

#[derive(Clone)]
pub struct Runner {
    config: ScenarioConfig,
}

impl Runner {
    pub fn new(config: ScenarioConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    fn open_session(&self) -> anyhow::Result<Session> {
        let clock = Arc::new(ManualClock::new());
        let local = Arc::new(CaptionScheduler::with_clock(
            self.config.captions.clone(),
            clock.clone(),
        ));
        let formatter = Arc::new(CaptionFormatter::new(&self.config.format));
        let human = self.config.format.human_colour.clone();
        let hub = Arc::new(RelayHub::new());

        let local_sink: Arc<dyn CaptionSink> = Arc::new(FormattedSink::new(
            local.clone(),
            formatter.clone(),
            human.clone(),
        ));
        hub.join(LOCAL_PEER, local_sink.clone());

        let mut remotes = Vec::new();
        for &peer in self.config.peers.iter().filter(|peer| **peer != LOCAL_PEER) {
            let scheduler = Arc::new(CaptionScheduler::with_clock(
                self.config.captions.clone(),
                clock.clone(),
            ));
            hub.join(
                peer,
                Arc::new(FormattedSink::new(
                    scheduler.clone(),
                    formatter.clone(),
                    human.clone(),
                )),
            );
            remotes.push((peer, scheduler));
        }

        debug!("relay hub wired with {} peers", hub.peer_count());

        let relayed = Arc::new(AtomicUsize::new(0));
        let hook = RecognitionHook::new();
        if self.config.options.speech_to_text {
            let hub = hub.clone();
            let counter = relayed.clone();
            let echo = self.config.options.self_captions.then_some(local_sink);
            hook.register(move |text| {
                counter.fetch_add(hub.broadcast(LOCAL_PEER, text), Ordering::Relaxed);
                if let Some(sink) = &echo {
                    sink.submit(text, None, 0.0);
                }
            })
            .context("registering speech handler")?;
        }

        Ok(Session {
            clock,
            local,
            formatter,
            hub,
            hook,
            remotes,
            relayed,
            log: LogManager::new(self.config.options.log_sound_names),
            tally: SoundTally::default(),
        })
    }

    fn play_sound(
        &self,
        session: &mut Session,
        clip: &str,
        position: [f32; 3],
        volume: f32,
        rolloff: &RolloffSpec,
    ) {
        let name = clip_name(clip);
        let result = SpatialAnalyzer::analyze(
            &self.config.listener.pose(),
            &EmitterPose::new(Vec3::from(position)),
            &rolloff.to_rolloff(),
            volume,
            &self.config.analyzer,
        );
        if !result.audible {
            session.log.inaudible(name, result.raw_strength);
            session.tally.inaudible += 1;
            return;
        }

        if self.config.options.suppress_game_captions {
            return;
        }

        // A clip caption takes precedence over dialogue for the same clip.
        let format = &self.config.format;
        if let Some(caption) = self.config.clips.get(name) {
            session.log.captioned(name, result.raw_strength);
            let text = session.formatter.format(
                caption,
                &format.main_colour,
                Some(&result),
                result.raw_strength,
            );
            let key = CaptionFormatter::dedup_key(&text);
            session.local.enqueue(text, Some(&key), 0.0);
        } else if let Some(lines) = self.config.dialogue.get(name) {
            session.log.captioned(name, result.raw_strength);
            for line in lines {
                let text = session.formatter.format(
                    &line.text,
                    &format.dialogue_colour,
                    Some(&result),
                    result.raw_strength,
                );
                session.local.enqueue(text, None, line.at);
            }
        } else {
            session.log.uncaptioned(name);
            session.tally.uncaptioned += 1;
        }
    }

    fn apply(&self, session: &mut Session, event: &ScenarioEvent) {
        match &event.kind {
            EventKind::Sound {
                clip,
                position,
                volume,
                rolloff,
            } => self.play_sound(session, clip, *position, *volume, rolloff),
            EventKind::Relay { from, text } => {
                let delivered = session.hub.broadcast(*from, text);
                session.relayed.fetch_add(delivered, Ordering::Relaxed);
            }
            EventKind::Speech { text } => {
                session.hook.recognized(text);
            }
        }
    }

    /// Replays the scenario for `ticks` frames spaced `tick_ms` apart,
    /// snapshotting then sweeping after each frame's events.
    pub fn execute(&self, ticks: usize, tick_ms: u64) -> anyhow::Result<ReplayResult> {
        self.config.validate().context("validating scenario")?;
        let mut session = self.open_session()?;

        let mut events = self.config.events.clone();
        events.sort_by_key(|event| event.at_ms);
        let mut pending = events.iter().peekable();

        let max_lines = self.config.captions.max_visible_lines;
        let mut frames = Vec::with_capacity(ticks);
        for tick in 0..ticks as u64 {
            let now_ms = tick.saturating_mul(tick_ms);
            while let Some(event) = pending.next_if(|event| event.at_ms <= now_ms) {
                session.clock.set_elapsed(Duration::from_millis(event.at_ms));
                self.apply(&mut session, event);
            }
            session.clock.set_elapsed(Duration::from_millis(now_ms));

            frames.push(Frame {
                at_ms: now_ms,
                lines: session.local.snapshot(max_lines),
            });
            session.local.sweep();
            for (_, remote) in &session.remotes {
                remote.sweep();
            }
        }

        if pending.peek().is_some() {
            session.log.record("replay ended before every scenario event was played");
        }

        Ok(ReplayResult {
            frames,
            metrics: session.local.metrics(),
            relayed: session.relayed.load(Ordering::Relaxed),
            uncaptioned: session.tally.uncaptioned,
            inaudible: session.tally.inaudible,
            remote_inserted: session
                .remotes
                .iter()
                .map(|(peer, scheduler)| (*peer, scheduler.metrics().inserted))
                .collect(),
        })
    }
}
