use serde::{Deserialize, Serialize};

/// Maps a normalized strength to an opacity with
/// `alpha = min_alpha + (1 - min_alpha) * strength^gamma`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpacityCurve {
    pub min_alpha: f32,
    pub gamma: f32,
}

impl OpacityCurve {
    /// Solves `gamma` so that `sample_strength` maps to `sample_alpha`.
    ///
    /// Falls back to a linear map (`gamma = 1`) when the calibration point
    /// cannot be satisfied by a power curve.
    pub fn calibrated(min_alpha: f32, sample_strength: f32, sample_alpha: f32) -> Self {
        let min_alpha = if min_alpha.is_finite() {
            min_alpha.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let solvable = min_alpha < 1.0
            && sample_alpha > min_alpha
            && sample_alpha < 1.0
            && sample_strength > 0.0
            && sample_strength < 1.0;
        if !solvable {
            return Self::linear(min_alpha);
        }

        let ratio = (sample_alpha - min_alpha) / (1.0 - min_alpha);
        let gamma = ratio.ln() / sample_strength.ln();
        if gamma.is_finite() && gamma > 0.0 {
            Self { min_alpha, gamma }
        } else {
            Self::linear(min_alpha)
        }
    }

    pub fn linear(min_alpha: f32) -> Self {
        Self {
            min_alpha,
            gamma: 1.0,
        }
    }

    pub fn alpha(&self, strength: f32) -> f32 {
        let s = if strength.is_finite() {
            strength.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let alpha = self.min_alpha + (1.0 - self.min_alpha) * s.powf(self.gamma);
        alpha.clamp(0.0, 1.0)
    }

    /// Opacity as an 8-bit colour channel.
    pub fn alpha_byte(&self, strength: f32) -> u8 {
        (self.alpha(strength) * 255.0).round() as u8
    }
}

impl Default for OpacityCurve {
    /// Faint at silence, half opacity at 80% strength.
    fn default() -> Self {
        Self::calibrated(0.2, 0.8, 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calibrated_curve_hits_all_three_points() {
        let curve = OpacityCurve::default();
        assert!((curve.alpha(0.0) - 0.2).abs() < 1e-6);
        assert!((curve.alpha(0.8) - 0.5).abs() < 1e-4);
        assert!((curve.alpha(1.0) - 1.0).abs() < 1e-6);
        assert!((curve.gamma - 4.3955).abs() < 1e-3);
    }

    #[test]
    fn degenerate_calibration_is_linear() {
        assert_eq!(OpacityCurve::calibrated(0.2, 0.8, 0.1).gamma, 1.0);
        assert_eq!(OpacityCurve::calibrated(0.2, 0.0, 0.5).gamma, 1.0);
        assert_eq!(OpacityCurve::calibrated(0.2, 1.0, 0.5).gamma, 1.0);
        let linear = OpacityCurve::linear(0.0);
        assert!((linear.alpha(0.4) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn alpha_byte_spans_channel() {
        let curve = OpacityCurve::linear(0.0);
        assert_eq!(curve.alpha_byte(0.0), 0);
        assert_eq!(curve.alpha_byte(1.0), 255);
        assert_eq!(curve.alpha_byte(f32::NAN), 0);
        assert_eq!(OpacityCurve::default().alpha_byte(0.0), 51);
    }

    #[test]
    fn alpha_is_monotonic_in_strength() {
        let curve = OpacityCurve::default();
        let mut previous = curve.alpha(0.0);
        for step in 1..=20 {
            let next = curve.alpha(step as f32 / 20.0);
            assert!(next >= previous);
            previous = next;
        }
    }
}
