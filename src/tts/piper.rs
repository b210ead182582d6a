//! Piper TTS backend calling a local binary

use super::{find_in_path, TtsEngine, Utterance};
use crate::config::Config;
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, info};

/// Tracks the clip that is playing so a cancel can stop it.
///
/// Every cancel bumps the epoch; a clip may only start if no cancel happened
/// since its utterance began, and only the clip that registered a ticket may
/// clear the slot again.
#[derive(Debug)]
struct PlaybackSlot<S> {
    inner: Mutex<SlotState<S>>,
}

#[derive(Debug)]
struct SlotState<S> {
    epoch: u64,
    next_ticket: u64,
    current: Option<(u64, S)>,
}

impl<S> PlaybackSlot<S> {
    fn new() -> Self {
        Self {
            inner: Mutex::new(SlotState {
                epoch: 0,
                next_ticket: 0,
                current: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState<S>> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    /// Register `sink` and run `start` on it, unless cancelled since `epoch`
    fn start(&self, epoch: u64, sink: S, start: impl FnOnce(&S)) -> Option<u64> {
        let mut state = self.lock();
        if state.epoch != epoch {
            return None;
        }
        state.next_ticket += 1;
        let ticket = state.next_ticket;
        start(&sink);
        state.current = Some((ticket, sink));
        Some(ticket)
    }

    /// Clear the slot if `ticket` still owns it
    fn release(&self, ticket: u64) {
        let mut state = self.lock();
        if matches!(state.current, Some((owner, _)) if owner == ticket) {
            state.current = None;
        }
    }

    /// Invalidate every clip not yet started and hand back the one playing
    fn cancel(&self) -> Option<S> {
        let mut state = self.lock();
        state.epoch += 1;
        state.current.take().map(|(_, sink)| sink)
    }
}

pub struct PiperEngine {
    model_path: PathBuf,
    playing: Arc<PlaybackSlot<Arc<rodio::Sink>>>,
}

impl std::fmt::Debug for PiperEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PiperEngine")
            .field("model_path", &self.model_path)
            .finish()
    }
}

impl PiperEngine {
    pub fn new(config: &Config) -> Result<Self> {
        if find_in_path("piper-tts").is_none() {
            return Err(anyhow::anyhow!("piper-tts binary not found on PATH"));
        }

        let data_dir = dirs::data_dir().unwrap_or_default().join("farmvoice/voices");
        let model_path = data_dir.join(format!("{}.onnx", config.piper_voice));
        if !model_path.exists() {
            return Err(anyhow::anyhow!(
                "Piper model not found at {}",
                model_path.display()
            ));
        }

        Ok(Self {
            model_path,
            playing: Arc::new(PlaybackSlot::new()),
        })
    }

    /// Piper slows speech down as the length scale grows
    pub fn length_scale(rate: f32) -> f32 {
        1.0 / rate.max(0.1)
    }

    /// Synthesize into a temporary WAV that is removed when dropped
    async fn synthesize(&self, utterance: &Utterance) -> Result<TempPath> {
        let wav_path = tempfile::Builder::new()
            .prefix("farmvoice_speech_")
            .suffix(".wav")
            .tempfile()?
            .into_temp_path();

        let mut child = Command::new("piper-tts")
            .arg("-m")
            .arg(&self.model_path)
            .arg("-f")
            .arg(&*wav_path)
            .arg("--length_scale")
            .arg(Self::length_scale(utterance.rate).to_string())
            .stdin(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                error!("❌ Failed to spawn piper-tts: {}", e);
                anyhow::anyhow!("Failed to spawn piper-tts: {}", e)
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(utterance.text.as_bytes()).await?;
            stdin.flush().await?;
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(anyhow::anyhow!("Piper failed with status {}", status));
        }
        if std::fs::metadata(&wav_path)?.len() == 0 {
            return Err(anyhow::anyhow!("Piper produced no audio"));
        }
        Ok(wav_path)
    }
}

#[async_trait]
impl TtsEngine for PiperEngine {
    async fn speak(&self, utterance: &Utterance) -> Result<()> {
        info!("📢 Piper speaking: '{}'", utterance.text);

        let epoch = self.playing.epoch();
        let wav_path = self.synthesize(utterance).await?;
        let volume = utterance.volume;
        let playing = Arc::clone(&self.playing);

        // rodio blocks until the clip ends; the WAV goes away with `wav_path`
        tokio::task::spawn_blocking(move || -> Result<()> {
            let (_stream, stream_handle) = rodio::OutputStream::try_default()
                .map_err(|e| anyhow::anyhow!("No audio output: {}", e))?;
            let file = std::fs::File::open(&wav_path)?;
            let source = rodio::Decoder::new(std::io::BufReader::new(file))
                .map_err(|e| anyhow::anyhow!("Failed to decode piper output: {}", e))?;
            let sink = Arc::new(
                rodio::Sink::try_new(&stream_handle)
                    .map_err(|e| anyhow::anyhow!("Failed to open sink: {}", e))?,
            );
            sink.set_volume(volume);

            let Some(ticket) = playing.start(epoch, Arc::clone(&sink), |sink| sink.append(source))
            else {
                debug!("Piper clip cancelled before playback");
                return Ok(());
            };
            debug!("✅ Playing Piper WAV: {:?}", wav_path);
            sink.sleep_until_end();
            playing.release(ticket);
            Ok(())
        })
        .await
        .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }

    fn cancel(&self) {
        if let Some(sink) = self.playing.cancel() {
            sink.stop();
        }
    }

    fn name(&self) -> &str {
        "piper"
    }
}
