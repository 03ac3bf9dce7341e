//! Optional speech-recognition hookup.
//!
//! A recognition engine, when one is present, hands recognized text to
//! [`RecognitionHook::recognized`]. The host registers a single handler that
//! decides what to do with it (typically relay it to other players). With no
//! handler registered, recognized text is dropped silently.

use log::info;
use std::sync::{Mutex, OnceLock};

type SpeechHandler = Box<dyn Fn(&str) + Send + Sync>;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum HookError {
    #[error("a recognition handler is already registered")]
    AlreadyRegistered,
}

#[derive(Default)]
pub struct RecognitionHook {
    handler: OnceLock<SpeechHandler>,
    last_text: Mutex<Option<String>>,
}

impl RecognitionHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        handler: impl Fn(&str) + Send + Sync + 'static,
    ) -> Result<(), HookError> {
        self.handler
            .set(Box::new(handler))
            .map_err(|_| HookError::AlreadyRegistered)
    }

    pub fn is_registered(&self) -> bool {
        self.handler.get().is_some()
    }

    /// Delivers recognized text to the handler. Returns whether it was delivered.
    ///
    /// Blank text and text identical to the previous delivery are dropped.
    pub fn recognized(&self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        let Some(handler) = self.handler.get() else {
            return false;
        };

        {
            let mut last = match self.last_text.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if last.as_deref() == Some(text) {
                return false;
            }
            *last = Some(text.to_owned());
        }

        info!("recognized speech: {}", text);
        handler(text);
        true
    }
}
