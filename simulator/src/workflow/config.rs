use anyhow::Context;
use captioncore::config::{AnalyzerConfig, CaptionConfig};
use captioncore::math::{Keyframe, Vec3};
use captioncore::spatial::{CustomCurve, ListenerPose, RolloffConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerSpec {
    pub position: [f32; 3],
    pub forward: [f32; 3],
}

impl Default for ListenerSpec {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            forward: [0.0, 0.0, 1.0],
        }
    }
}

impl ListenerSpec {
    pub fn pose(&self) -> ListenerPose {
        ListenerPose::new(Vec3::from(self.position), Vec3::from(self.forward))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloffKind {
    Linear,
    #[default]
    Logarithmic,
    Custom,
}

/// Emitter rolloff as written in a scenario. `points` are `[u, factor]`
/// pairs and only used by the custom mode.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloffSpec {
    pub min_distance: f32,
    pub max_distance: f32,
    pub mode: RolloffKind,
    pub points: Vec<[f32; 2]>,
}

impl Default for RolloffSpec {
    fn default() -> Self {
        Self {
            min_distance: 1.0,
            max_distance: 500.0,
            mode: RolloffKind::Logarithmic,
            points: Vec::new(),
        }
    }
}

impl RolloffSpec {
    pub fn to_rolloff(&self) -> RolloffConfig {
        match self.mode {
            RolloffKind::Linear => RolloffConfig::linear(self.min_distance, self.max_distance),
            RolloffKind::Logarithmic => {
                RolloffConfig::logarithmic(self.min_distance, self.max_distance)
            }
            RolloffKind::Custom => RolloffConfig::custom(
                self.min_distance,
                self.max_distance,
                CustomCurve::from_keyframes(
                    self.points.iter().map(|[u, factor]| Keyframe::new(*u, *factor)),
                ),
            ),
        }
    }
}

/// Colours and background used by the formatter.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    pub main_colour: String,
    pub dialogue_colour: String,
    pub human_colour: String,
    pub background_visible: bool,
    pub background_colour: String,
    pub background_opacity: u8,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            main_colour: "#FFF000".into(),
            dialogue_colour: "#00FF00".into(),
            human_colour: "#FF9900".into(),
            background_visible: false,
            background_colour: "#000000".into(),
            background_opacity: 50,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    /// Log every clip name the pipeline sees.
    pub log_sound_names: bool,
    /// Drop clip captions and dialogue; speech and relayed text still show.
    pub suppress_game_captions: bool,
    /// Register the recognition hook.
    pub speech_to_text: bool,
    /// Show the local player's own recognized speech.
    pub self_captions: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DialogueLine {
    /// Seconds after the clip starts.
    pub at: f32,
    pub text: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    Sound {
        clip: String,
        position: [f32; 3],
        #[serde(default = "full_volume")]
        volume: f32,
        #[serde(default)]
        rolloff: RolloffSpec,
    },
    /// Text relayed over the network by another player.
    Relay { from: u64, text: String },
    /// Text recognized from the local player's microphone.
    Speech { text: String },
}

fn full_volume() -> f32 {
    1.0
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenarioEvent {
    pub at_ms: u64,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub name: Option<String>,
    pub listener: ListenerSpec,
    pub analyzer: AnalyzerConfig,
    pub captions: CaptionConfig,
    pub format: FormatConfig,
    pub options: OptionsConfig,
    /// Remote players taking part in the relay.
    pub peers: Vec<u64>,
    /// One caption per clip name.
    pub clips: BTreeMap<String, String>,
    /// Timed lines per clip name.
    pub dialogue: BTreeMap<String, Vec<DialogueLine>>,
    pub events: Vec<ScenarioEvent>,
}

impl ScenarioConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading scenario {}", path_ref.display()))?;
        let config: ScenarioConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing scenario {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.analyzer.validate().context("analyzer settings")?;
        self.captions.validate().context("caption settings")?;
        Ok(())
    }
}
