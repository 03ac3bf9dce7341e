//! Core of the spatial caption system.
//!
//! [`spatial`] decides whether a sound is audible to the listener, how strong
//! it is and where it comes from. [`captions`] holds the captions produced
//! from those sounds, suppresses noisy repeats and fades lines out before
//! they expire. Engine hooks, UI and networking live outside this crate and
//! talk to it through [`prelude::CaptionSink`] and
//! [`captions::CaptionScheduler::snapshot`].

pub mod captions;
pub mod config;
pub mod math;
pub mod prelude;
pub mod spatial;
pub mod speech;
pub mod telemetry;

pub use prelude::{CaptionError, CaptionResult, CaptionSink};
