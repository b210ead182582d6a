//! Listening controller
//!
//! Gates the "listening" flag and announces each transition through the
//! speech output. No audio is captured here.

use crate::speech::SpeechOutput;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub const ACTIVATED_PHRASE: &str = "Voice assistant activated. How can I help you?";
pub const DEACTIVATED_PHRASE: &str = "Voice assistant deactivated.";

pub struct ListeningController {
    listening: AtomicBool,
    speech: Arc<SpeechOutput>,
}

impl ListeningController {
    pub fn new(speech: Arc<SpeechOutput>) -> Self {
        Self {
            listening: AtomicBool::new(false),
            speech,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    /// Start listening; no-op when already listening
    pub fn start(&self) {
        if self
            .listening
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        info!("🎙️ Listening started");
        self.speech.speak(ACTIVATED_PHRASE);
    }

    /// Stop listening; no-op when not listening
    pub fn stop(&self) {
        if self
            .listening
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        info!("🎙️ Listening stopped");
        self.speech.speak(DEACTIVATED_PHRASE);
    }

    /// Flip between listening and not listening
    pub fn toggle(&self) {
        if self.is_listening() {
            self.stop();
        } else {
            self.start();
        }
    }
}
