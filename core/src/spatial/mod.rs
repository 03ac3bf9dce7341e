//! Perceived loudness and direction of sound emitters.

pub mod analyzer;
pub mod direction;
pub mod proximity;
pub mod rolloff;

pub use analyzer::{AnalysisResult, EmitterPose, ListenerPose, SpatialAnalyzer};
pub use direction::{Cardinal, CardinalSector};
pub use proximity::{nearest_peers, Peer};
pub use rolloff::{CustomCurve, RolloffConfig, RolloffMode};
