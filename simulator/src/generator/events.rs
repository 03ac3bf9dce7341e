use crate::workflow::config::{
    DialogueLine, EventKind, RolloffKind, RolloffSpec, ScenarioConfig, ScenarioEvent,
};
use anyhow::ensure;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Clip names and captions used by generated scenarios.
const CLIPS: &[(&str, &str)] = &[
    ("door_open", "Door opens"),
    ("door_close", "Door slams shut"),
    ("footsteps", "Footsteps"),
    ("vent_crawl", "Something crawls in the vents"),
    ("turret_fire", "Gunfire"),
    ("ship_horn", "Ship horn blares"),
    ("item_drop", "Item clatters"),
];

const RELAY_LINES: &[&str] = &["over here", "wait for me", "found scrap", "run!"];

/// Settings for a random scenario. The same seed always produces the same
/// events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub events: usize,
    pub seed: u64,
    /// Emitters are placed within this distance of the listener.
    pub radius: f32,
    /// Events are spread over this span.
    pub duration_ms: u64,
    pub peers: Vec<u64>,
    /// Share of events that are relayed text rather than sounds.
    pub relay_ratio: f64,
    pub name: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            events: 24,
            seed: 0,
            radius: 40.0,
            duration_ms: 20_000,
            peers: vec![1, 2],
            relay_ratio: 0.15,
            name: None,
        }
    }
}

fn random_sound(rng: &mut StdRng, radius: f32) -> EventKind {
    let (clip, _) = CLIPS.choose(rng).copied().unwrap_or(CLIPS[0]);
    let bearing = rng.gen_range(-180.0f32..180.0).to_radians();
    let distance = rng.gen_range(0.5..radius.max(1.0));
    let height = rng.gen_range(-4.0f32..4.0);
    let mode = if rng.gen_bool(0.5) {
        RolloffKind::Linear
    } else {
        RolloffKind::Logarithmic
    };

    EventKind::Sound {
        clip: format!("{clip}.wav"),
        position: [bearing.sin() * distance, height, bearing.cos() * distance],
        volume: rng.gen_range(0.4..=1.0),
        rolloff: RolloffSpec {
            min_distance: 1.0,
            max_distance: radius.max(1.0) * 1.25,
            mode,
            points: Vec::new(),
        },
    }
}

pub fn build_scenario(config: &GeneratorConfig) -> anyhow::Result<ScenarioConfig> {
    ensure!(config.radius.is_finite() && config.radius > 0.0, "radius must be positive");
    ensure!(
        (0.0..=1.0).contains(&config.relay_ratio),
        "relay ratio must be within [0, 1]"
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let span = config.duration_ms.max(1);
    let mut events = Vec::with_capacity(config.events);

    for _ in 0..config.events {
        let at_ms = rng.gen_range(0..span);
        let relay_from = if rng.gen_bool(config.relay_ratio) {
            config.peers.choose(&mut rng).copied()
        } else {
            None
        };
        let kind = match relay_from {
            Some(from) => EventKind::Relay {
                from,
                text: RELAY_LINES.choose(&mut rng).copied().unwrap_or("hello").to_owned(),
            },
            None => random_sound(&mut rng, config.radius),
        };
        events.push(ScenarioEvent { at_ms, kind });
    }
    events.sort_by_key(|event| event.at_ms);

    let mut scenario = ScenarioConfig {
        name: config.name.clone().or_else(|| Some(format!("generated-{}", config.seed))),
        peers: config.peers.clone(),
        events,
        ..Default::default()
    };
    scenario.clips = CLIPS
        .iter()
        .map(|(clip, caption)| ((*clip).to_owned(), (*caption).to_owned()))
        .collect();
    scenario.dialogue.insert(
        "ship_horn".to_owned(),
        vec![
            DialogueLine {
                at: 0.5,
                text: "Ship leaving in one minute".to_owned(),
            },
            DialogueLine {
                at: 2.0,
                text: "Return to the ship".to_owned(),
            },
        ],
    );

    Ok(scenario)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_builds_requested_event_count() {
        let config = GeneratorConfig {
            events: 50,
            seed: 3,
            ..Default::default()
        };
        let scenario = build_scenario(&config).unwrap();
        assert_eq!(scenario.events.len(), 50);
        assert!(scenario
            .events
            .windows(2)
            .all(|pair| pair[0].at_ms <= pair[1].at_ms));
        assert!(scenario.events.iter().all(|event| event.at_ms < config.duration_ms));
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn same_seed_same_events() {
        let config = GeneratorConfig {
            seed: 42,
            ..Default::default()
        };
        let a = build_scenario(&config).unwrap();
        let b = build_scenario(&config).unwrap();
        let render = |s: &ScenarioConfig| format!("{:?}", s.events);
        assert_eq!(render(&a), render(&b));
    }

    #[test]
    fn sounds_stay_within_radius() {
        let config = GeneratorConfig {
            events: 100,
            radius: 10.0,
            relay_ratio: 0.0,
            ..Default::default()
        };
        for event in build_scenario(&config).unwrap().events {
            match event.kind {
                EventKind::Sound { position, .. } => {
                    let flat = (position[0] * position[0] + position[2] * position[2]).sqrt();
                    assert!(flat <= 10.0 + 1e-3);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let config = GeneratorConfig {
            radius: 0.0,
            ..Default::default()
        };
        assert!(build_scenario(&config).is_err());
        let config = GeneratorConfig {
            relay_ratio: 1.5,
            ..Default::default()
        };
        assert!(build_scenario(&config).is_err());
    }
}
