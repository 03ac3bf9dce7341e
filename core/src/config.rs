use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration values that fail validation.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("audible threshold {0} must be within 0..=100 percent")]
    ThresholdOutOfRange(f32),
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("fade window {fade_ms}ms exceeds expiration {expiration_ms}ms")]
    FadeLongerThanExpiration { fade_ms: u64, expiration_ms: u64 },
    #[error("max visible lines must be at least 1")]
    NoVisibleLines,
}

/// Inputs for the spatial analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Minimum perceived volume, on a 0-100 scale, considered audible.
    pub audible_threshold_percent: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            audible_threshold_percent: 12.0,
        }
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.audible_threshold_percent;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(ConfigError::ThresholdOutOfRange(threshold));
        }
        Ok(())
    }
}

/// Timing and behaviour switches for the caption scheduler.
///
/// A key inside its cooldown holds its caption at full opacity, so keep
/// `dedup_cooldown_ms` at or below `expiration_ms - fade_window_ms` for keyed
/// captions to fade.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    pub expiration_ms: u64,
    pub dedup_cooldown_ms: u64,
    pub fade_window_ms: u64,
    pub fading_enabled: bool,
    pub dedup_enabled: bool,
    pub max_visible_lines: usize,
    pub sweep_interval_ms: u64,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            expiration_ms: 5_000,
            dedup_cooldown_ms: 3_000,
            fade_window_ms: 2_000,
            fading_enabled: false,
            dedup_enabled: true,
            max_visible_lines: 4,
            sweep_interval_ms: 1_000,
        }
    }
}

/// Ledger entries older than this are forgotten by the sweep.
pub const LEDGER_STALE_THRESHOLD: Duration = Duration::from_secs(30);

impl CaptionConfig {
    pub fn expiration(&self) -> Duration {
        Duration::from_millis(self.expiration_ms)
    }

    pub fn dedup_cooldown(&self) -> Duration {
        Duration::from_millis(self.dedup_cooldown_ms)
    }

    pub fn fade_window(&self) -> Duration {
        Duration::from_millis(self.fade_window_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Age after which a ledger key is pruned; never shorter than the cooldown.
    pub fn ledger_stale_after(&self) -> Duration {
        LEDGER_STALE_THRESHOLD.max(self.dedup_cooldown())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.expiration_ms == 0 {
            return Err(ConfigError::ZeroDuration("expiration_ms"));
        }
        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration("sweep_interval_ms"));
        }
        if self.fade_window_ms > self.expiration_ms {
            return Err(ConfigError::FadeLongerThanExpiration {
                fade_ms: self.fade_window_ms,
                expiration_ms: self.expiration_ms,
            });
        }
        if self.max_visible_lines == 0 {
            return Err(ConfigError::NoVisibleLines);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(AnalyzerConfig::default().validate().is_ok());
        assert!(CaptionConfig::default().validate().is_ok());
    }

    #[test]
    fn threshold_outside_percent_scale_is_rejected() {
        let cfg = AnalyzerConfig {
            audible_threshold_percent: 120.0,
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ThresholdOutOfRange(120.0)));
    }

    #[test]
    fn fade_window_cannot_exceed_expiration() {
        let cfg = CaptionConfig {
            expiration_ms: 1_000,
            fade_window_ms: 2_000,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::FadeLongerThanExpiration { .. })
        ));
    }

    #[test]
    fn ledger_threshold_covers_long_cooldowns() {
        let cfg = CaptionConfig {
            dedup_cooldown_ms: 45_000,
            ..Default::default()
        };
        assert_eq!(cfg.ledger_stale_after(), Duration::from_secs(45));
        assert_eq!(
            CaptionConfig::default().ledger_stale_after(),
            LEDGER_STALE_THRESHOLD
        );
    }
}
