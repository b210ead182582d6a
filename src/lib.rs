//! FarmVoice Library
//!
//! Voice layer (settings, speech output, listening, subtitles, shortcuts)
//! and the weather-aware farming advisor behind it.

pub mod advisor;
pub mod chat;
pub mod config;
pub mod error;
pub mod hotkeys;
pub mod listening;
pub mod settings;
pub mod speech;
pub mod storage;
pub mod subtitles;
pub mod tts;
pub mod voice;
pub mod weather;
