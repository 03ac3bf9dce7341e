use serde::{Deserialize, Serialize};
use std::fmt;

/// One of eight 45° sectors around the listener, centered on the compass points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CardinalSector {
    Front,
    FrontRight,
    Right,
    BackRight,
    Back,
    BackLeft,
    Left,
    FrontLeft,
}

impl CardinalSector {
    pub const ALL: [CardinalSector; 8] = [
        CardinalSector::Front,
        CardinalSector::FrontRight,
        CardinalSector::Right,
        CardinalSector::BackRight,
        CardinalSector::Back,
        CardinalSector::BackLeft,
        CardinalSector::Left,
        CardinalSector::FrontLeft,
    ];

    /// Buckets a horizontal angle (degrees, positive to the right).
    ///
    /// Sectors are half-open `[lower, upper)`; `Back` takes `[157.5, 180]`
    /// together with `(-180, -157.5)`. Angles outside `(-180, 180]` are
    /// wrapped first; NaN maps to `Front`.
    pub fn from_angle(angle: f32) -> Self {
        if angle.is_nan() {
            return CardinalSector::Front;
        }
        let a = normalize_degrees(angle);

        if (-22.5..22.5).contains(&a) {
            CardinalSector::Front
        } else if (22.5..67.5).contains(&a) {
            CardinalSector::FrontRight
        } else if (67.5..112.5).contains(&a) {
            CardinalSector::Right
        } else if (112.5..157.5).contains(&a) {
            CardinalSector::BackRight
        } else if (-157.5..-112.5).contains(&a) {
            CardinalSector::BackLeft
        } else if (-112.5..-67.5).contains(&a) {
            CardinalSector::Left
        } else if (-67.5..-22.5).contains(&a) {
            CardinalSector::FrontLeft
        } else {
            CardinalSector::Back
        }
    }

    pub fn is_left(self) -> bool {
        matches!(
            self,
            CardinalSector::FrontLeft | CardinalSector::Left | CardinalSector::BackLeft
        )
    }

    pub fn is_right(self) -> bool {
        matches!(
            self,
            CardinalSector::FrontRight | CardinalSector::Right | CardinalSector::BackRight
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            CardinalSector::Front => "front",
            CardinalSector::FrontRight => "front-right",
            CardinalSector::Right => "right",
            CardinalSector::BackRight => "back-right",
            CardinalSector::Back => "back",
            CardinalSector::BackLeft => "back-left",
            CardinalSector::Left => "left",
            CardinalSector::FrontLeft => "front-left",
        }
    }
}

/// Where a sound sits relative to the listener. Sources straight above or
/// below have no meaningful horizontal bearing and bypass the sectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinal {
    Sector(CardinalSector),
    Above,
    Below,
}

impl Cardinal {
    pub fn sector(self) -> Option<CardinalSector> {
        match self {
            Cardinal::Sector(sector) => Some(sector),
            Cardinal::Above | Cardinal::Below => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Cardinal::Sector(sector) => sector.label(),
            Cardinal::Above => "above",
            Cardinal::Below => "below",
        }
    }
}

impl fmt::Display for Cardinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Wraps degrees into `(-180, 180]`.
pub fn normalize_degrees(angle: f32) -> f32 {
    let mut a = angle % 360.0;
    if a <= -180.0 {
        a += 360.0;
    } else if a > 180.0 {
        a -= 360.0;
    }
    a
}
