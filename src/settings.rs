//! Voice settings store
//!
//! Holds the speech configuration, persists it as one JSON record and
//! publishes every change so the speech output always reads fresh values.

use crate::storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Storage key of the persisted settings record
pub const SETTINGS_KEY: &str = "voice_settings";

pub const MIN_SPEED: f32 = 0.5;
pub const MAX_SPEED: f32 = 2.0;
pub const MIN_VOLUME: f32 = 0.0;
pub const MAX_VOLUME: f32 = 1.0;

/// Language codes offered by the settings panel
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("en-US", "English (US)"),
    ("en-GB", "English (UK)"),
    ("es-ES", "Spanish"),
    ("fr-FR", "French"),
    ("de-DE", "German"),
    ("it-IT", "Italian"),
    ("pt-BR", "Portuguese"),
    ("zh-CN", "Chinese"),
    ("ja-JP", "Japanese"),
    ("ko-KR", "Korean"),
];

/// Speech configuration applied to every utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub enabled: bool,
    pub speed: f32,
    pub pitch: f32,
    pub volume: f32,
    pub language: String,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            speed: 1.0,
            pitch: 1.0,
            volume: 1.0,
            language: "en-US".to_string(),
        }
    }
}

impl VoiceSettings {
    /// Force every field into its valid range.
    ///
    /// Out-of-range speed and volume are clamped, never rejected. Non-finite
    /// numbers and an empty language fall back to the default for that field.
    pub fn clamped(mut self) -> Self {
        let defaults = Self::default();

        self.speed = if self.speed.is_finite() {
            self.speed.clamp(MIN_SPEED, MAX_SPEED)
        } else {
            defaults.speed
        };
        self.volume = if self.volume.is_finite() {
            self.volume.clamp(MIN_VOLUME, MAX_VOLUME)
        } else {
            defaults.volume
        };
        if !self.pitch.is_finite() {
            self.pitch = defaults.pitch;
        }
        if self.language.trim().is_empty() {
            self.language = defaults.language;
        }
        self
    }

    /// Merge a partial update into a copy of these settings
    pub fn merged(&self, update: &VoiceSettingsUpdate) -> Self {
        Self {
            enabled: update.enabled.unwrap_or(self.enabled),
            speed: update.speed.unwrap_or(self.speed),
            pitch: update.pitch.unwrap_or(self.pitch),
            volume: update.volume.unwrap_or(self.volume),
            language: update
                .language
                .clone()
                .unwrap_or_else(|| self.language.clone()),
        }
        .clamped()
    }
}

/// Partial settings update, `None` fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettingsUpdate {
    pub enabled: Option<bool>,
    pub speed: Option<f32>,
    pub pitch: Option<f32>,
    pub volume: Option<f32>,
    pub language: Option<String>,
}

impl VoiceSettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Owns the current settings record, last write wins
pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
    current: watch::Sender<VoiceSettings>,
}

impl SettingsStore {
    /// Load persisted settings, or defaults when missing or corrupt
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let settings = match store.get(SETTINGS_KEY) {
            Some(raw) => match serde_json::from_str::<VoiceSettings>(&raw) {
                Ok(settings) => {
                    debug!("Loaded voice settings: {:?}", settings);
                    settings.clamped()
                }
                Err(e) => {
                    warn!("⚠️ Stored voice settings are invalid, using defaults: {}", e);
                    VoiceSettings::default()
                }
            },
            None => {
                info!("No stored voice settings, using defaults");
                VoiceSettings::default()
            }
        };

        let (current, _) = watch::channel(settings);
        Self { store, current }
    }

    /// Current settings
    pub fn get(&self) -> VoiceSettings {
        self.current.borrow().clone()
    }

    /// Merge, clamp, persist and publish a partial update
    pub fn update(&self, update: VoiceSettingsUpdate) -> VoiceSettings {
        let mut merged = VoiceSettings::default();
        self.current.send_modify(|current| {
            *current = current.merged(&update);
            merged = current.clone();
        });

        match serde_json::to_string(&merged) {
            Ok(json) => {
                if let Err(e) = self.store.set(SETTINGS_KEY, &json) {
                    warn!("⚠️ Failed to persist voice settings: {}", e);
                }
            }
            Err(e) => warn!("⚠️ Failed to serialize voice settings: {}", e),
        }

        debug!("Voice settings updated: {:?}", merged);
        merged
    }

    /// Watch settings changes
    pub fn subscribe(&self) -> watch::Receiver<VoiceSettings> {
        self.current.subscribe()
    }
}
