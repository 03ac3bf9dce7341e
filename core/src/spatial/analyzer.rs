use crate::config::AnalyzerConfig;
use crate::math::Vec3;
use crate::spatial::direction::{normalize_degrees, Cardinal, CardinalSector};
use crate::spatial::rolloff::RolloffConfig;
use serde::{Deserialize, Serialize};

/// Horizontal offsets at or below this length count as straight up or down.
const VERTICAL_EPSILON: f32 = 1e-4;

/// Listener position and facing for a single query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ListenerPose {
    pub position: Vec3,
    pub forward: Vec3,
}

impl ListenerPose {
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        Self { position, forward }
    }

    fn is_valid(&self) -> bool {
        self.position.is_finite() && self.forward.is_finite() && self.forward.magnitude() > 0.0
    }
}

impl Default for ListenerPose {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::FORWARD)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EmitterPose {
    pub position: Vec3,
}

impl EmitterPose {
    pub fn new(position: Vec3) -> Self {
        Self { position }
    }
}

/// Perceived loudness and direction of one emitter for one listener.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub distance: f32,
    /// Degrees in `(-180, 180]`, positive to the listener's right.
    pub horizontal_angle_deg: f32,
    /// Degrees in `[-90, 90]`, positive upwards.
    pub vertical_angle_deg: f32,
    /// World-space offset from listener to emitter.
    pub direction: Vec3,
    pub cardinal: Cardinal,
    /// Attenuated volume in `[0, 1]`.
    pub raw_strength: f32,
    pub audible: bool,
}

impl AnalysisResult {
    /// Result used for geometry that cannot be analyzed.
    pub fn silent() -> Self {
        Self {
            distance: 0.0,
            horizontal_angle_deg: 0.0,
            vertical_angle_deg: 0.0,
            direction: Vec3::ZERO,
            cardinal: Cardinal::Sector(CardinalSector::Front),
            raw_strength: 0.0,
            audible: false,
        }
    }
}

/// Stateless audibility and direction computations.
pub struct SpatialAnalyzer;

impl SpatialAnalyzer {
    pub fn analyze(
        listener: &ListenerPose,
        emitter: &EmitterPose,
        rolloff: &RolloffConfig,
        volume: f32,
        config: &AnalyzerConfig,
    ) -> AnalysisResult {
        if !listener.is_valid() || !emitter.position.is_finite() {
            return AnalysisResult::silent();
        }

        let to_source = emitter.position - listener.position;
        let distance = to_source.magnitude();
        if !distance.is_finite() {
            return AnalysisResult::silent();
        }

        let raw_strength = Self::strength(rolloff, distance, volume);

        let flat = to_source.flattened();
        let flat_len = flat.magnitude();
        let vertical_angle_deg = to_source.y.atan2(flat_len).to_degrees().clamp(-90.0, 90.0);

        let (horizontal_angle_deg, cardinal) = if flat_len <= VERTICAL_EPSILON {
            let cardinal = if to_source.y > 0.0 {
                Cardinal::Above
            } else {
                Cardinal::Below
            };
            (0.0, cardinal)
        } else {
            // Listener pitch does not turn the horizontal heading.
            let heading = listener.forward.flattened();
            let heading = if heading.magnitude() > VERTICAL_EPSILON {
                heading
            } else {
                listener.forward
            };
            let angle = normalize_degrees(heading.signed_angle(flat, Vec3::UP));
            (angle, Cardinal::Sector(CardinalSector::from_angle(angle)))
        };

        AnalysisResult {
            distance,
            horizontal_angle_deg,
            vertical_angle_deg,
            direction: to_source,
            cardinal,
            raw_strength,
            audible: Self::is_audible(raw_strength, config.audible_threshold_percent),
        }
    }

    /// Attenuated volume at `distance`, clamped to `[0, 1]`.
    pub fn strength(rolloff: &RolloffConfig, distance: f32, volume: f32) -> f32 {
        if volume.is_nan() || volume <= 0.0 {
            return 0.0;
        }
        let strength = rolloff.attenuation(distance) * volume;
        if strength.is_finite() {
            strength.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Inclusive comparison against a threshold on the 0-100 scale.
    pub fn is_audible(strength: f32, threshold_percent: f32) -> bool {
        strength > 0.0 && strength >= threshold_percent / 100.0
    }
}
