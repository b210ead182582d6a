//! Speech output
//!
//! At most one utterance plays at a time. A new `speak` cancels whatever is
//! in flight (last call wins, nothing is queued) and every state change is
//! published on a watch channel for the subtitle presenter.

use crate::settings::VoiceSettings;
use crate::tts::{TtsEngine, Utterance};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Observable state of the current utterance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtteranceState {
    pub text: String,
    pub is_speaking: bool,
}

impl UtteranceState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn speaking(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_speaking: true,
        }
    }
}

/// Lifecycle notifications, one `Started` and one terminal event per
/// utterance that was not cancelled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    Started { id: u64, text: String },
    Ended { id: u64 },
    Failed { id: u64, reason: String },
}

/// Where the engine is in its playback cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechPhase {
    Idle,
    /// Requested, playback not started yet
    Pending,
    Speaking,
}

struct Playback {
    id: u64,
    phase: SpeechPhase,
    handle: JoinHandle<()>,
}

struct Shared {
    state: watch::Sender<UtteranceState>,
    events: broadcast::Sender<SpeechEvent>,
    current: Mutex<Option<Playback>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Option<Playback>> {
        self.current.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn reset_state(&self) {
        self.state.send_if_modified(|state| {
            if state.is_speaking || !state.text.is_empty() {
                *state = UtteranceState::idle();
                true
            } else {
                false
            }
        });
    }

    async fn play(self: Arc<Self>, id: u64, engine: Arc<dyn TtsEngine>, utterance: Utterance) {
        {
            let mut current = self.lock();
            match current.as_mut() {
                Some(playback) if playback.id == id => playback.phase = SpeechPhase::Speaking,
                _ => return,
            }
            self.state
                .send_replace(UtteranceState::speaking(utterance.text.clone()));
            let _ = self.events.send(SpeechEvent::Started {
                id,
                text: utterance.text.clone(),
            });
        }
        debug!("🔊 Utterance #{} started via {}", id, engine.name());

        let result = engine.speak(&utterance).await;

        let mut current = self.lock();
        if !matches!(current.as_ref(), Some(playback) if playback.id == id) {
            debug!("Utterance #{} finished after being superseded", id);
            return;
        }
        current.take();
        self.reset_state();

        let event = match result {
            Ok(()) => {
                debug!("Utterance #{} ended", id);
                SpeechEvent::Ended { id }
            }
            Err(e) => {
                warn!("⚠️ Utterance #{} failed: {}", id, e);
                SpeechEvent::Failed {
                    id,
                    reason: e.to_string(),
                }
            }
        };
        let _ = self.events.send(event);
    }
}

/// Turns text into audio with the current voice settings
pub struct SpeechOutput {
    engine: Option<Arc<dyn TtsEngine>>,
    settings: watch::Receiver<VoiceSettings>,
    shared: Arc<Shared>,
    next_id: AtomicU64,
}

impl SpeechOutput {
    /// `engine` is `None` when the host has no speech capability
    pub fn new(
        engine: Option<Arc<dyn TtsEngine>>,
        settings: watch::Receiver<VoiceSettings>,
    ) -> Self {
        let (state, _) = watch::channel(UtteranceState::idle());
        let (events, _) = broadcast::channel(64);
        Self {
            engine,
            settings,
            shared: Arc::new(Shared {
                state,
                events,
                current: Mutex::new(None),
            }),
            next_id: AtomicU64::new(0),
        }
    }

    /// Whether a speech engine is present
    pub fn is_available(&self) -> bool {
        self.engine.is_some()
    }

    /// Start speaking `text`, cancelling the utterance in flight.
    ///
    /// Returns immediately. Silently does nothing when voice is disabled,
    /// no engine exists, or there is no async runtime to play on.
    pub fn speak(&self, text: &str) {
        let settings = self.settings.borrow().clone();
        if !settings.enabled {
            debug!("Voice disabled, not speaking: '{}'", text);
            return;
        }
        let Some(engine) = self.engine.clone() else {
            debug!("No speech engine, not speaking: '{}'", text);
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("⚠️ No async runtime, cannot speak: '{}'", text);
            return;
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let utterance = Utterance::new(text, &settings);

        let mut current = self.shared.lock();
        if let Some(previous) = current.take() {
            previous.handle.abort();
            // A pending utterance never reached the engine
            if previous.phase == SpeechPhase::Speaking {
                engine.cancel();
            }
            self.shared.reset_state();
            debug!("Utterance #{} cancelled by #{}", previous.id, id);
        }

        let handle = runtime.spawn(Arc::clone(&self.shared).play(id, engine, utterance));
        *current = Some(Playback {
            id,
            phase: SpeechPhase::Pending,
            handle,
        });
    }

    /// Cancel playback and reset to idle. Safe to call at any time.
    pub fn stop(&self) {
        let mut current = self.shared.lock();
        if let Some(previous) = current.take() {
            previous.handle.abort();
            if previous.phase == SpeechPhase::Speaking {
                if let Some(engine) = &self.engine {
                    engine.cancel();
                }
            }
            debug!("Utterance #{} stopped", previous.id);
        }
        self.shared.reset_state();
    }

    pub fn state(&self) -> UtteranceState {
        self.shared.state.borrow().clone()
    }

    pub fn is_speaking(&self) -> bool {
        self.shared.state.borrow().is_speaking
    }

    pub fn phase(&self) -> SpeechPhase {
        self.shared
            .lock()
            .as_ref()
            .map_or(SpeechPhase::Idle, |playback| playback.phase)
    }

    /// Watch utterance state changes
    pub fn subscribe(&self) -> watch::Receiver<UtteranceState> {
        self.shared.state.subscribe()
    }

    /// Receive lifecycle events from now on
    pub fn events(&self) -> broadcast::Receiver<SpeechEvent> {
        self.shared.events.subscribe()
    }
}

impl Drop for SpeechOutput {
    fn drop(&mut self) {
        if let Some(playback) = self.shared.lock().take() {
            playback.handle.abort();
        }
    }
}
