//! Time-windowed caption queue shared by concurrent producers and a renderer.

pub mod clock;
pub mod entry;
pub mod opacity;
pub mod scheduler;
mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{CaptionEntry, CaptionLine, EnqueueOutcome, SweepReport};
pub use opacity::OpacityCurve;
pub use scheduler::CaptionScheduler;
