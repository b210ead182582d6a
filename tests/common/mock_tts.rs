//! Mock TTS Engine for Testing
//!
//! Records all spoken utterances for verification.

use anyhow::Result;
use async_trait::async_trait;
use farmvoice::tts::{TtsEngine, Utterance};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock TTS engine that records spoken utterances
#[derive(Debug)]
pub struct MockTts {
    /// Every utterance that reached the engine, cancelled or not
    pub spoken: Arc<Mutex<Vec<Utterance>>>,
    /// Simulate failure on next speak
    pub should_fail: Arc<Mutex<bool>>,
    /// How long a single utterance takes to play
    pub duration: Duration,
}

impl MockTts {
    pub fn new() -> Self {
        Self::with_duration(Duration::from_millis(300))
    }

    pub fn with_duration(duration: Duration) -> Self {
        Self {
            spoken: Arc::new(Mutex::new(Vec::new())),
            should_fail: Arc::new(Mutex::new(false)),
            duration,
        }
    }

    /// Get all spoken phrases
    pub fn get_spoken(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap()
            .iter()
            .map(|u| u.text.clone())
            .collect()
    }

    /// Check if a phrase was spoken
    pub fn was_spoken(&self, text: &str) -> bool {
        self.spoken
            .lock()
            .unwrap()
            .iter()
            .any(|u| u.text.contains(text))
    }

    pub fn last(&self) -> Option<Utterance> {
        self.spoken.lock().unwrap().last().cloned()
    }
}

impl Default for MockTts {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TtsEngine for MockTts {
    async fn speak(&self, utterance: &Utterance) -> Result<()> {
        self.spoken.lock().unwrap().push(utterance.clone());
        if *self.should_fail.lock().unwrap() {
            return Err(anyhow::anyhow!("Mock TTS failure"));
        }
        tokio::time::sleep(self.duration).await;
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
