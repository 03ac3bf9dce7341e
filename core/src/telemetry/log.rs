use log::{debug, info};

/// Diagnostic logging for sound events seen by the caption pipeline.
///
/// Sound names are only logged when `log_sound_names` is set, which is how
/// caption authors discover clips that still lack a caption.
pub struct LogManager {
    log_sound_names: bool,
}

impl LogManager {
    pub fn new(log_sound_names: bool) -> Self {
        Self { log_sound_names }
    }

    pub fn enabled(&self) -> bool {
        self.log_sound_names
    }

    pub fn captioned(&self, clip: &str, strength: f32) {
        if self.log_sound_names {
            info!("found caption for {} (strength {:.2})", clip, strength);
        }
    }

    pub fn uncaptioned(&self, clip: &str) {
        if self.log_sound_names {
            info!("no caption for {}", clip);
        }
    }

    pub fn inaudible(&self, clip: &str, strength: f32) {
        if self.log_sound_names {
            debug!("{} below audible threshold (strength {:.2})", clip, strength);
        }
    }

    pub fn record(&self, message: &str) {
        info!("{}", message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new(false)
    }
}
