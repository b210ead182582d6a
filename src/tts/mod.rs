//! TTS (Text-to-Speech) Module
//!
//! Provides a unified interface for multiple TTS backends. Availability
//! depends on the host, so the factory may come back empty and the rest of
//! the voice layer then runs silently.

use crate::config::Config;
use crate::settings::VoiceSettings;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

pub mod piper;
pub mod speechd;
pub mod system;

/// One playback request with the speech parameters it was issued with
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub language: String,
}

impl Utterance {
    pub fn new(text: impl Into<String>, settings: &VoiceSettings) -> Self {
        Self {
            text: text.into(),
            rate: settings.speed,
            pitch: settings.pitch,
            volume: settings.volume,
            language: settings.language.clone(),
        }
    }
}

/// Trait for TTS engines
#[async_trait]
pub trait TtsEngine: Send + Sync + std::fmt::Debug {
    /// Speak the utterance, resolving once playback has finished
    async fn speak(&self, utterance: &Utterance) -> Result<()>;

    /// Stop any audio that is still playing
    fn cancel(&self) {}

    /// Get the engine name
    fn name(&self) -> &str;
}

/// Factory to create the configured TTS engine.
///
/// Returns `None` when no speech capability exists on this host.
pub async fn create_engine(config: &Config) -> Option<Arc<dyn TtsEngine>> {
    info!("🛠️ Creating TTS engine: {}", config.tts_engine);
    let engine: Option<Arc<dyn TtsEngine>> = match config.tts_engine.as_str() {
        "none" | "silent" => None,
        "piper" => match piper::PiperEngine::new(config) {
            Ok(engine) => {
                info!("  - Using Piper TTS (Voice: {})", config.piper_voice);
                Some(Arc::new(engine))
            }
            Err(e) => {
                warn!("  - Piper unavailable ({}), falling back to System", e);
                system_engine()
            }
        },
        "speechd_ng" | "speechd" => match speechd::SpeechdEngine::connect().await {
            Ok(client) => {
                info!("  - Using Speechd TTS");
                Some(Arc::new(client))
            }
            Err(e) => {
                warn!("  - Speechd unavailable ({}), falling back to System", e);
                system_engine()
            }
        },
        "system" => system_engine(),
        _ => {
            warn!(
                "  - Unknown engine '{}', falling back to System",
                config.tts_engine
            );
            system_engine()
        }
    };

    match &engine {
        Some(engine) => info!("✅ TTS engine '{}' initialized", engine.name()),
        None => warn!("🔇 No speech capability available, voice output is silent"),
    }
    engine
}

fn system_engine() -> Option<Arc<dyn TtsEngine>> {
    system::SystemEngine::detect().map(|engine| Arc::new(engine) as Arc<dyn TtsEngine>)
}

/// Whether an executable with this name is on `PATH`
pub(crate) fn find_in_path(program: &str) -> Option<std::path::PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
