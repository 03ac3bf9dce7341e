pub use crate::captions::{CaptionLine, CaptionScheduler, Clock, EnqueueOutcome};
pub use crate::config::{AnalyzerConfig, CaptionConfig, ConfigError};
pub use crate::math::Vec3;
pub use crate::spatial::{
    AnalysisResult, Cardinal, CardinalSector, EmitterPose, ListenerPose, RolloffConfig,
    SpatialAnalyzer,
};
pub use crate::speech::{HookError, RecognitionHook};

/// Failures starting or stopping the background sweep.
#[derive(thiserror::Error, Debug)]
pub enum SchedulerError {
    #[error("sweeper already running")]
    AlreadyRunning,
    #[error("sweeper state poisoned")]
    Poisoned,
    #[error("failed to start sweeper: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Common error type for the caption core.
#[derive(thiserror::Error, Debug)]
pub enum CaptionError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("scheduler: {0}")]
    Scheduler(#[from] SchedulerError),
    #[error("speech hook: {0}")]
    Hook(#[from] HookError),
}

pub type CaptionResult<T> = Result<T, CaptionError>;

/// Anything that accepts captions from a producer: local sound hooks,
/// relayed network text, speech recognition.
pub trait CaptionSink: Send + Sync {
    fn submit(&self, text: &str, dedup_key: Option<&str>, delay_seconds: f32) -> EnqueueOutcome;
}
