//! Speechd-ng TTS backend using D-Bus
//!
//! The service exposes no prosody controls, no stop call and no completion
//! signal. Language selects the voice; rate, pitch and volume are left to the
//! daemon. Playback is assumed to last as long as the text takes to read at
//! the requested rate, so utterance state and captions track it, and a
//! cancel ends that wait although the daemon finishes its own queue.

use crate::tts::{TtsEngine, Utterance};
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};
use zbus::{proxy, Connection};

#[proxy(
    interface = "org.speech.Service",
    default_service = "org.speech.Service",
    default_path = "/org/speech/Service"
)]
trait SpeechService {
    /// Speak text using default voice
    fn speak(&self, text: &str) -> zbus::Result<()>;

    /// Speak text using specific voice
    fn speak_voice(&self, text: &str, voice: &str) -> zbus::Result<()>;

    /// Ping the service
    fn ping(&self) -> zbus::Result<String>;
}

/// Reading pace at rate 1.0
const WORDS_PER_MINUTE: f32 = 175.0;

pub struct SpeechdEngine {
    proxy: SpeechServiceProxy<'static>,
}

impl std::fmt::Debug for SpeechdEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechdEngine").finish()
    }
}

impl SpeechdEngine {
    pub async fn connect() -> Result<Self> {
        let connection = Connection::session().await?;
        let proxy = SpeechServiceProxy::new(&connection).await?;

        match proxy.ping().await {
            Ok(response) => {
                info!("🔊 Connected to speechd-ng: {}", response);
            }
            Err(e) => {
                warn!("⚠️ speechd-ng not responding: {}", e);
                return Err(anyhow::anyhow!("speechd-ng not responding: {}", e));
            }
        }

        warn!("⚠️ speechd-ng applies its own rate, pitch and volume; only the language is forwarded");
        Ok(Self { proxy })
    }

    /// How long the daemon will take to read `utterance`
    pub fn playback_estimate(utterance: &Utterance) -> Duration {
        let words = utterance.text.split_whitespace().count().max(1) as f32;
        let rate = if utterance.rate.is_finite() {
            utterance.rate.clamp(0.5, 2.0)
        } else {
            1.0
        };
        Duration::from_secs_f32(words * 60.0 / (WORDS_PER_MINUTE * rate))
    }
}

#[async_trait]
impl TtsEngine for SpeechdEngine {
    async fn speak(&self, utterance: &Utterance) -> Result<()> {
        debug!(
            "speechd-ng speaking ({}): {}",
            utterance.language, utterance.text
        );
        if utterance.language.is_empty() {
            self.proxy.speak(&utterance.text).await?;
        } else {
            self.proxy
                .speak_voice(&utterance.text, &utterance.language)
                .await?;
        }

        // The call returns once queued; hold the utterance open while it plays
        tokio::time::sleep(Self::playback_estimate(utterance)).await;
        Ok(())
    }

    fn name(&self) -> &str {
        "speechd_ng"
    }
}
