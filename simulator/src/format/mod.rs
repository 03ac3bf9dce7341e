//! Caption markup: directional brackets, strength-tinted colour and an
//! optional highlighted background.

use crate::workflow::config::FormatConfig;
use captioncore::captions::{EnqueueOutcome, OpacityCurve};
use captioncore::spatial::{AnalysisResult, Cardinal, CardinalSector};
use captioncore::CaptionSink;
use regex::Regex;
use std::sync::{Arc, LazyLock};

/// Vertical angle beyond which a caption gets an up/down marker.
const VERTICAL_MARKER_DEG: f32 = 25.0;

static MARKUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</?(?:color|mark)(?:=#[0-9A-Fa-f]{6}(?:[0-9A-Fa-f]{2})?)?>")
        .expect("markup pattern is valid")
});

pub struct CaptionFormatter {
    opacity: OpacityCurve,
    highlight: Option<String>,
}

impl CaptionFormatter {
    pub fn new(config: &FormatConfig) -> Self {
        let highlight = config.background_visible.then(|| {
            let opacity = f32::from(config.background_opacity.min(100)) / 100.0;
            format!("{}{:02X}", config.background_colour, (opacity * 255.0) as u8)
        });
        Self {
            opacity: OpacityCurve::default(),
            highlight,
        }
    }

    pub fn format(
        &self,
        text: &str,
        colour: &str,
        location: Option<&AnalysisResult>,
        strength: f32,
    ) -> String {
        let inner = match location {
            Some(info) => directional_wrap(text, info),
            None => text.to_owned(),
        };
        let colour = if strength.is_finite() && strength.clamp(0.0, 1.0) > 0.0 {
            format!("{}{:02X}", colour, self.opacity.alpha_byte(strength))
        } else {
            colour.to_owned()
        };
        match &self.highlight {
            Some(mark) => format!("<mark={mark}><color={colour}>{inner}</color></mark>"),
            None => format!("<color={colour}>{inner}</color>"),
        }
    }

    /// Caption text with colour and background tags removed, used to match
    /// repeats of the same sound regardless of its current strength.
    pub fn dedup_key(formatted: &str) -> String {
        MARKUP_RE.replace_all(formatted, "").into_owned()
    }
}

fn directional_wrap(text: &str, info: &AnalysisResult) -> String {
    let vertical = if info.vertical_angle_deg >= VERTICAL_MARKER_DEG {
        Some("^")
    } else if info.vertical_angle_deg <= -VERTICAL_MARKER_DEG {
        Some("v")
    } else {
        None
    };

    match info.cardinal {
        Cardinal::Sector(sector) if sector.is_left() => {
            format!("< {} {}", text, vertical.unwrap_or("]"))
        }
        Cardinal::Sector(sector) if sector.is_right() => {
            format!("{} {} >", vertical.unwrap_or("["), text)
        }
        Cardinal::Sector(CardinalSector::Back) => {
            let marker = vertical.unwrap_or("*");
            format!("{marker} {text} {marker}")
        }
        _ => match vertical {
            Some(marker) => format!("{marker} {text} {marker}"),
            None => format!("[{text}]"),
        },
    }
}

/// Formats plain text before handing it to another sink. Relayed and
/// recognized speech arrive unformatted and go through one of these.
pub struct FormattedSink {
    inner: Arc<dyn CaptionSink>,
    formatter: Arc<CaptionFormatter>,
    colour: String,
}

impl FormattedSink {
    pub fn new(
        inner: Arc<dyn CaptionSink>,
        formatter: Arc<CaptionFormatter>,
        colour: String,
    ) -> Self {
        Self {
            inner,
            formatter,
            colour,
        }
    }
}

impl CaptionSink for FormattedSink {
    fn submit(&self, text: &str, dedup_key: Option<&str>, delay_seconds: f32) -> EnqueueOutcome {
        if text.trim().is_empty() {
            return EnqueueOutcome::Ignored;
        }
        let formatted = self.formatter.format(text, &self.colour, None, 0.0);
        self.inner.submit(&formatted, dedup_key, delay_seconds)
    }
}
