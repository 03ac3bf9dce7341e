use serde::{Deserialize, Serialize};

/// Control point of a [`Curve`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
}

impl Keyframe {
    pub const fn new(time: f32, value: f32) -> Self {
        Self { time, value }
    }
}

/// Piecewise-linear curve that passes through each keyframe exactly and
/// holds the end values outside the keyed range.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Curve {
    keys: Vec<Keyframe>,
}

impl Curve {
    /// Builds a curve from keyframes in any order. Non-finite keys are dropped.
    pub fn new(keys: impl IntoIterator<Item = Keyframe>) -> Self {
        let mut keys: Vec<Keyframe> = keys
            .into_iter()
            .filter(|k| k.time.is_finite() && k.value.is_finite())
            .collect();
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keys }
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    pub fn evaluate(&self, time: f32) -> f32 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0.0,
        };
        if time.is_nan() {
            return first.value;
        }
        if time <= first.time {
            return first.value;
        }
        if time >= last.time {
            return last.value;
        }

        // first key whose time is strictly after `time`; always >= 1 here
        let upper = self.keys.partition_point(|k| k.time <= time);
        let a = self.keys[upper - 1];
        let b = self.keys[upper];
        let span = b.time - a.time;
        if span <= 0.0 {
            return b.value;
        }
        let t = (time - a.time) / span;
        a.value + (b.value - a.value) * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_passes_through_keys() {
        let curve = Curve::new([
            Keyframe::new(1.0, 0.0),
            Keyframe::new(0.0, 1.0),
            Keyframe::new(0.5, 0.25),
        ]);
        assert_eq!(curve.evaluate(0.0), 1.0);
        assert_eq!(curve.evaluate(0.5), 0.25);
        assert_eq!(curve.evaluate(1.0), 0.0);
        assert!((curve.evaluate(0.25) - 0.625).abs() < 1e-6);
    }

    #[test]
    fn curve_holds_end_values() {
        let curve = Curve::new([Keyframe::new(0.0, 1.0), Keyframe::new(1.0, 0.5)]);
        assert_eq!(curve.evaluate(-3.0), 1.0);
        assert_eq!(curve.evaluate(7.0), 0.5);
    }

    #[test]
    fn empty_curve_evaluates_to_zero() {
        assert_eq!(Curve::default().evaluate(0.3), 0.0);
    }
}
