//! Global keyboard shortcuts
//!
//! Alt+V toggles listening, Alt+S stops speech. Key events come from `rdev`
//! on a dedicated thread and are forwarded as [`Shortcut`]s.

use rdev::{EventType, Key};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Action requested from the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    ToggleListening,
    StopSpeaking,
}

/// Tracks modifier state and recognizes shortcut chords
#[derive(Debug, Default)]
pub struct ShortcutDetector {
    alt_down: bool,
}

impl ShortcutDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one key event, returns a shortcut when a chord completes
    pub fn on_event(&mut self, event: &EventType) -> Option<Shortcut> {
        match event {
            EventType::KeyPress(Key::Alt) | EventType::KeyPress(Key::AltGr) => {
                self.alt_down = true;
                None
            }
            EventType::KeyRelease(Key::Alt) | EventType::KeyRelease(Key::AltGr) => {
                self.alt_down = false;
                None
            }
            EventType::KeyPress(Key::KeyV) if self.alt_down => Some(Shortcut::ToggleListening),
            EventType::KeyPress(Key::KeyS) if self.alt_down => Some(Shortcut::StopSpeaking),
            _ => None,
        }
    }
}

/// Listen for shortcuts system-wide.
///
/// When the platform refuses global input (no display, missing
/// permissions) the failure is logged and the channel closes.
pub fn spawn_listener() -> mpsc::UnboundedReceiver<Shortcut> {
    let (tx, rx) = mpsc::unbounded_channel();

    let spawned = std::thread::Builder::new()
        .name("farmvoice-hotkeys".to_string())
        .spawn(move || {
            let mut detector = ShortcutDetector::new();
            info!("⌨️ Shortcuts active: Alt+V toggles listening, Alt+S stops speech");
            let result = rdev::listen(move |event| {
                if let Some(shortcut) = detector.on_event(&event.event_type) {
                    debug!("Shortcut pressed: {:?}", shortcut);
                    let _ = tx.send(shortcut);
                }
            });
            if let Err(e) = result {
                warn!("⚠️ Global shortcuts unavailable: {:?}", e);
            }
        });

    if let Err(e) = spawned {
        warn!("⚠️ Failed to start shortcut listener: {}", e);
    }
    rx
}
