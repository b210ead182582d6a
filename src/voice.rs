//! Voice context
//!
//! Wires the settings store, speech output, listening controller and subtitle
//! presenter together. Built once per session with [`VoiceContext::new`] and
//! torn down with [`VoiceContext::shutdown`].

use crate::hotkeys::Shortcut;
use crate::listening::ListeningController;
use crate::settings::{SettingsStore, VoiceSettings, VoiceSettingsUpdate};
use crate::speech::{SpeechEvent, SpeechOutput, SpeechPhase, UtteranceState};
use crate::storage::KeyValueStore;
use crate::subtitles::{SubtitlePhase, SubtitlePresenter};
use crate::tts::TtsEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

pub const LANGUAGE_UPDATED_PHRASE: &str = "Language updated";
pub const VOICE_ENABLED_PHRASE: &str = "Voice assistant enabled";
pub const TEST_PHRASE: &str =
    "This is a test of the voice assistant. The current speed and volume settings are being applied.";

pub struct VoiceContext {
    settings: SettingsStore,
    speech: Arc<SpeechOutput>,
    listening: ListeningController,
    subtitles: SubtitlePresenter,
}

impl VoiceContext {
    /// Build the voice layer. Must be called inside a tokio runtime.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        engine: Option<Arc<dyn TtsEngine>>,
        subtitle_decay: Duration,
    ) -> Self {
        let settings = SettingsStore::load(store);
        let speech = Arc::new(SpeechOutput::new(engine, settings.subscribe()));
        let listening = ListeningController::new(Arc::clone(&speech));
        let subtitles = SubtitlePresenter::spawn(speech.subscribe(), subtitle_decay);

        info!(
            "🗣️ Voice context ready (speech {})",
            if speech.is_available() {
                "available"
            } else {
                "unavailable"
            }
        );
        Self {
            settings,
            speech,
            listening,
            subtitles,
        }
    }

    pub fn settings(&self) -> VoiceSettings {
        self.settings.get()
    }

    /// Apply a settings change and announce it like the settings panel does
    pub fn update_settings(&self, update: VoiceSettingsUpdate) -> VoiceSettings {
        let before = self.settings.get();
        let after = self.settings.update(update);

        if after.enabled && !before.enabled {
            self.speech.speak(VOICE_ENABLED_PHRASE);
        } else if after.language != before.language {
            self.speech.speak(LANGUAGE_UPDATED_PHRASE);
        }
        after
    }

    /// Speak the fixed test phrase with the current settings
    pub fn test_voice(&self) {
        self.speech.speak(TEST_PHRASE);
    }

    pub fn speak(&self, text: &str) {
        self.speech.speak(text);
    }

    pub fn stop_speaking(&self) {
        self.speech.stop();
    }

    pub fn is_speaking(&self) -> bool {
        self.speech.is_speaking()
    }

    /// Whether an utterance is queued or playing
    pub fn is_busy(&self) -> bool {
        self.speech.phase() != SpeechPhase::Idle
    }

    pub fn start_listening(&self) {
        self.listening.start();
    }

    pub fn stop_listening(&self) {
        self.listening.stop();
    }

    pub fn is_listening(&self) -> bool {
        self.listening.is_listening()
    }

    /// Dispatch a keyboard shortcut against the state at this moment
    pub fn handle_shortcut(&self, shortcut: Shortcut) {
        debug!("Handling shortcut {:?}", shortcut);
        match shortcut {
            Shortcut::ToggleListening => self.listening.toggle(),
            Shortcut::StopSpeaking => {
                if self.speech.is_speaking() {
                    self.speech.stop();
                }
            }
        }
    }

    pub fn utterance(&self) -> UtteranceState {
        self.speech.state()
    }

    pub fn speech_events(&self) -> broadcast::Receiver<SpeechEvent> {
        self.speech.events()
    }

    /// Caption currently shown, if any
    pub fn caption(&self) -> Option<String> {
        self.subtitles.caption()
    }

    /// Whether the subtitle overlay is up, including its fade-out window
    pub fn is_caption_visible(&self) -> bool {
        self.subtitles.is_visible()
    }

    pub fn subscribe_caption(&self) -> watch::Receiver<SubtitlePhase> {
        self.subtitles.subscribe()
    }

    /// Stop speech and the subtitle timer
    pub fn shutdown(self) {
        self.speech.stop();
        drop(self.subtitles);
        info!("🗣️ Voice context shut down");
    }
}
