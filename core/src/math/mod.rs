pub mod curve;
pub mod vector;

pub use curve::{Curve, Keyframe};
pub use vector::Vec3;
