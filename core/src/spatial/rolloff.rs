use crate::math::{Curve, Keyframe};
use std::fmt;
use std::sync::Arc;

/// Caller-supplied attenuation curve, evaluated on the normalized distance
/// `u` in `[0, 1]` between the emitter's min and max distance.
#[derive(Clone)]
pub struct CustomCurve(Arc<dyn Fn(f32) -> f32 + Send + Sync>);

impl CustomCurve {
    pub fn new(curve: impl Fn(f32) -> f32 + Send + Sync + 'static) -> Self {
        Self(Arc::new(curve))
    }

    /// Wraps a keyframed curve such as one authored on an emitter.
    pub fn from_keyframes(keys: impl IntoIterator<Item = Keyframe>) -> Self {
        let curve = Curve::new(keys);
        Self::new(move |u| curve.evaluate(u))
    }

    pub fn evaluate(&self, u: f32) -> f32 {
        (self.0)(u)
    }
}

impl fmt::Debug for CustomCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomCurve(..)")
    }
}

/// Distance-to-attenuation model of an emitter.
#[derive(Debug, Clone)]
pub enum RolloffMode {
    Linear,
    Logarithmic,
    Custom(CustomCurve),
}

#[derive(Debug, Clone)]
pub struct RolloffConfig {
    pub min_distance: f32,
    pub max_distance: f32,
    pub mode: RolloffMode,
}

impl RolloffConfig {
    pub fn linear(min_distance: f32, max_distance: f32) -> Self {
        Self {
            min_distance,
            max_distance,
            mode: RolloffMode::Linear,
        }
    }

    pub fn logarithmic(min_distance: f32, max_distance: f32) -> Self {
        Self {
            min_distance,
            max_distance,
            mode: RolloffMode::Logarithmic,
        }
    }

    pub fn custom(min_distance: f32, max_distance: f32, curve: CustomCurve) -> Self {
        Self {
            min_distance,
            max_distance,
            mode: RolloffMode::Custom(curve),
        }
    }

    pub fn range(&self) -> f32 {
        self.max_distance - self.min_distance
    }

    /// Attenuation factor in `[0, 1]` at `distance` from the emitter.
    ///
    /// Non-finite bounds or distances are silent (0). An empty or inverted
    /// range is always audible (1).
    pub fn attenuation(&self, distance: f32) -> f32 {
        if !self.min_distance.is_finite() || !self.max_distance.is_finite() || distance.is_nan()
        {
            return 0.0;
        }
        let range = self.range();
        if range <= 0.0 {
            return 1.0;
        }
        if distance < self.min_distance {
            return 1.0;
        }
        if distance > self.max_distance {
            return 0.0;
        }

        let u = (distance - self.min_distance) / range;
        let factor = match &self.mode {
            RolloffMode::Linear => 1.0 - u,
            RolloffMode::Logarithmic => self.logarithmic_curve().evaluate(u),
            RolloffMode::Custom(curve) => curve.evaluate(u),
        };

        if factor.is_finite() {
            factor.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Five-point approximation of the engine's logarithmic rolloff, keyed at
    /// quarter steps of the normalized distance.
    fn logarithmic_curve(&self) -> Curve {
        let min = self.min_distance;
        let range = self.range();
        Curve::new([
            Keyframe::new(0.0, 1.0),
            Keyframe::new(0.25, 1.0 / (min + range * 0.25)),
            Keyframe::new(0.5, 1.0 / (min + range * 0.5)),
            Keyframe::new(0.75, 1.0 / (min + range * 0.75)),
            Keyframe::new(1.0, 0.0),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_rolloff_interpolates_between_bounds() {
        let rolloff = RolloffConfig::linear(1.0, 21.0);
        assert_eq!(rolloff.attenuation(0.5), 1.0);
        assert!((rolloff.attenuation(11.0) - 0.5).abs() < 1e-6);
        assert_eq!(rolloff.attenuation(21.0), 0.0);
        assert_eq!(rolloff.attenuation(30.0), 0.0);
    }

    #[test]
    fn logarithmic_rolloff_hits_control_points() {
        let rolloff = RolloffConfig::logarithmic(2.0, 42.0);
        assert_eq!(rolloff.attenuation(2.0), 1.0);
        assert!((rolloff.attenuation(12.0) - 1.0 / 12.0).abs() < 1e-6);
        assert!((rolloff.attenuation(22.0) - 1.0 / 22.0).abs() < 1e-6);
        assert!((rolloff.attenuation(32.0) - 1.0 / 32.0).abs() < 1e-6);
        assert_eq!(rolloff.attenuation(42.0), 0.0);
    }

    #[test]
    fn logarithmic_rolloff_never_exceeds_unity() {
        let rolloff = RolloffConfig::logarithmic(0.1, 1.1);
        for step in 0..=100 {
            let distance = step as f32 * 0.012;
            let f = rolloff.attenuation(distance);
            assert!((0.0..=1.0).contains(&f), "{distance} -> {f}");
        }
    }

    #[test]
    fn custom_curve_receives_normalized_distance() {
        let rolloff = RolloffConfig::custom(10.0, 20.0, CustomCurve::new(|u| u * u));
        assert!((rolloff.attenuation(15.0) - 0.25).abs() < 1e-6);
        let keyed = RolloffConfig::custom(
            0.0,
            10.0,
            CustomCurve::from_keyframes([Keyframe::new(0.0, 1.0), Keyframe::new(1.0, 0.2)]),
        );
        assert!((keyed.attenuation(5.0) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn custom_curve_output_is_sanitized() {
        let rolloff = RolloffConfig::custom(0.0, 10.0, CustomCurve::new(|_| f32::NAN));
        assert_eq!(rolloff.attenuation(5.0), 0.0);
        let loud = RolloffConfig::custom(0.0, 10.0, CustomCurve::new(|_| 4.0));
        assert_eq!(loud.attenuation(5.0), 1.0);
    }

    #[test]
    fn degenerate_ranges_are_always_audible() {
        assert_eq!(RolloffConfig::linear(5.0, 5.0).attenuation(100.0), 1.0);
        assert_eq!(RolloffConfig::linear(9.0, 3.0).attenuation(6.0), 1.0);
        assert_eq!(RolloffConfig::linear(f32::NAN, 3.0).attenuation(1.0), 0.0);
    }
}
