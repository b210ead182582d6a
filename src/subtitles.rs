//! Subtitle presenter
//!
//! Mirrors the speech output into a caption. The overlay appears as soon as
//! speech starts and stays up for a decay delay after it ends; a new
//! utterance inside that window cancels the pending hide. The caption itself
//! is always the current utterance text, so nothing is shown once speech
//! has ended even while the overlay is still fading out.

use crate::speech::UtteranceState;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Default time the overlay stays up after speech ends
pub const DEFAULT_DECAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtitlePhase {
    Hidden,
    Visible { text: String },
    /// Speech ended, hide at `deadline` unless speech resumes
    Decaying { deadline: Instant },
}

impl SubtitlePhase {
    /// Text to display, `None` unless an utterance is being spoken
    pub fn caption(&self) -> Option<&str> {
        match self {
            SubtitlePhase::Visible { text } => Some(text),
            SubtitlePhase::Hidden | SubtitlePhase::Decaying { .. } => None,
        }
    }

    pub fn is_visible(&self) -> bool {
        !matches!(self, SubtitlePhase::Hidden)
    }
}

/// Caption state machine, driven by utterance updates and the clock
#[derive(Debug)]
pub struct SubtitleMachine {
    phase: SubtitlePhase,
    decay: Duration,
}

impl SubtitleMachine {
    pub fn new(decay: Duration) -> Self {
        Self {
            phase: SubtitlePhase::Hidden,
            decay,
        }
    }

    pub fn phase(&self) -> &SubtitlePhase {
        &self.phase
    }

    /// Apply the latest utterance state observed at `now`
    pub fn observe(&mut self, state: &UtteranceState, now: Instant) {
        if state.is_speaking && !state.text.is_empty() {
            self.phase = SubtitlePhase::Visible {
                text: state.text.clone(),
            };
            return;
        }

        if let SubtitlePhase::Visible { .. } = self.phase {
            self.phase = SubtitlePhase::Decaying {
                deadline: now + self.decay,
            };
        }
    }

    /// Hide the overlay if its decay deadline has passed
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.phase {
            SubtitlePhase::Decaying { deadline } if now >= deadline => {
                self.phase = SubtitlePhase::Hidden;
                true
            }
            _ => false,
        }
    }

    /// Pending hide, if any
    pub fn deadline(&self) -> Option<Instant> {
        match self.phase {
            SubtitlePhase::Decaying { deadline } => Some(deadline),
            _ => None,
        }
    }

    pub fn caption(&self) -> Option<&str> {
        self.phase.caption()
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Runs a [`SubtitleMachine`] against the speech output.
///
/// Dropping the presenter stops its task, so no hide fires afterwards.
pub struct SubtitlePresenter {
    phase: watch::Receiver<SubtitlePhase>,
    task: JoinHandle<()>,
}

impl SubtitlePresenter {
    /// Must be called inside a tokio runtime
    pub fn spawn(mut utterances: watch::Receiver<UtteranceState>, decay: Duration) -> Self {
        let (phase_tx, phase) = watch::channel(SubtitlePhase::Hidden);

        let task = tokio::spawn(async move {
            let mut machine = SubtitleMachine::new(decay);
            machine.observe(&utterances.borrow_and_update(), Instant::now());
            phase_tx.send_replace(machine.phase().clone());

            loop {
                tokio::select! {
                    changed = utterances.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = utterances.borrow_and_update().clone();
                        machine.observe(&state, Instant::now());
                    }
                    _ = wait_until(machine.deadline()) => {
                        if machine.expire(Instant::now()) {
                            debug!("Subtitle hidden after decay");
                        }
                    }
                }

                let next = machine.phase();
                phase_tx.send_if_modified(|current| {
                    if *current != *next {
                        *current = next.clone();
                        true
                    } else {
                        false
                    }
                });
            }

            phase_tx.send_replace(SubtitlePhase::Hidden);
        });

        Self { phase, task }
    }

    /// Caption currently on screen
    pub fn caption(&self) -> Option<String> {
        self.phase.borrow().caption().map(str::to_string)
    }

    /// Whether the overlay is up, including its decay window
    pub fn is_visible(&self) -> bool {
        self.phase.borrow().is_visible()
    }

    /// Watch presenter phase changes
    pub fn subscribe(&self) -> watch::Receiver<SubtitlePhase> {
        self.phase.clone()
    }
}

impl Drop for SubtitlePresenter {
    fn drop(&mut self) {
        self.task.abort();
    }
}
