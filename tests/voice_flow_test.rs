use farmvoice::advisor::{SUNNY_WATERING_RESPONSE, WARM_CROPS_RESPONSE};
use farmvoice::chat::ChatSession;
use farmvoice::hotkeys::Shortcut;
use farmvoice::listening::{ACTIVATED_PHRASE, DEACTIVATED_PHRASE};
use farmvoice::settings::{VoiceSettingsUpdate, SETTINGS_KEY};
use farmvoice::speech::SpeechEvent;
use farmvoice::storage::{KeyValueStore, SqliteStore};
use farmvoice::tts::TtsEngine;
use farmvoice::voice::VoiceContext;
use farmvoice::weather::{WeatherCondition, WeatherSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_test::assert_ok;

mod common;
use common::mock_tts::MockTts;

fn hot_sunny_day() -> WeatherSnapshot {
    WeatherSnapshot {
        location: "Fresno".to_string(),
        temperature: 31.0,
        condition: WeatherCondition::Sunny,
        humidity: 22.0,
        wind_speed: 9.0,
        forecast: "Hot and dry. High of 34°C, low of 18°C.".to_string(),
        alerts: Vec::new(),
        farming_advice: Vec::new(),
    }
}

fn voice_with(mock: &Arc<MockTts>, store: Arc<dyn KeyValueStore>) -> VoiceContext {
    VoiceContext::new(
        store,
        Some(mock.clone() as Arc<dyn TtsEngine>),
        Duration::from_millis(1000),
    )
}

#[tokio::test(start_paused = true)]
async fn test_chat_reply_is_spoken_and_captioned() {
    let mock = Arc::new(MockTts::new());
    let voice = voice_with(&mock, Arc::new(farmvoice::storage::MemoryStore::new()));
    let mut chat = ChatSession::new();
    let weather = hot_sunny_day();

    let reply = chat
        .send("What should I grow right now?", Some(&weather))
        .expect("reply expected")
        .content
        .clone();
    assert_eq!(reply, WARM_CROPS_RESPONSE);

    voice.speak(&reply);
    sleep(Duration::from_millis(10)).await;
    assert!(voice.is_speaking());
    assert_eq!(voice.caption().as_deref(), Some(WARM_CROPS_RESPONSE));

    // Speech ends at 300ms; the overlay fades for the decay with no text
    sleep(Duration::from_millis(600)).await;
    assert!(!voice.is_speaking());
    assert!(voice.is_caption_visible());
    assert_eq!(voice.caption(), None);

    sleep(Duration::from_millis(1000)).await;
    assert!(!voice.is_caption_visible());
    assert_eq!(mock.get_spoken(), vec![WARM_CROPS_RESPONSE.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_new_question_interrupts_previous_answer() {
    let mock = Arc::new(MockTts::with_duration(Duration::from_secs(5)));
    let voice = voice_with(&mock, Arc::new(farmvoice::storage::MemoryStore::new()));
    let mut events = voice.speech_events();
    let mut chat = ChatSession::new();
    let weather = hot_sunny_day();

    let first = chat
        .send("what crops for this heat", Some(&weather))
        .expect("reply expected")
        .content
        .clone();
    voice.speak(&first);
    sleep(Duration::from_millis(100)).await;

    let second = chat
        .send("how often should I water", Some(&weather))
        .expect("reply expected")
        .content
        .clone();
    assert_eq!(second, SUNNY_WATERING_RESPONSE);
    voice.speak(&second);
    sleep(Duration::from_secs(6)).await;

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    let ended: Vec<_> = seen
        .iter()
        .filter(|e| matches!(e, SpeechEvent::Ended { .. }))
        .collect();
    assert_eq!(ended.len(), 1, "only the latest answer completes");
    assert!(matches!(
        seen.last(),
        Some(SpeechEvent::Ended { .. })
    ));
    assert_eq!(voice.utterance().text, "");
}

#[tokio::test(start_paused = true)]
async fn test_shortcuts_drive_listening_and_stop() {
    let mock = Arc::new(MockTts::new());
    let voice = voice_with(&mock, Arc::new(farmvoice::storage::MemoryStore::new()));

    voice.handle_shortcut(Shortcut::ToggleListening);
    assert!(voice.is_listening());
    sleep(Duration::from_millis(10)).await;
    assert!(voice.is_speaking());

    voice.handle_shortcut(Shortcut::StopSpeaking);
    assert!(!voice.is_speaking());
    assert!(voice.is_listening(), "Alt+S leaves listening alone");

    voice.handle_shortcut(Shortcut::ToggleListening);
    assert!(!voice.is_listening());
    sleep(Duration::from_secs(1)).await;

    assert_eq!(
        mock.get_spoken(),
        vec![ACTIVATED_PHRASE.to_string(), DEACTIVATED_PHRASE.to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_settings_survive_restart() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("store.db");
    let mock = Arc::new(MockTts::new());

    {
        let store = assert_ok!(SqliteStore::new(db_path.clone()));
        let voice = voice_with(&mock, Arc::new(store));
        voice.update_settings(VoiceSettingsUpdate {
            speed: Some(3.0),
            volume: Some(0.4),
            language: Some("fr-FR".to_string()),
            ..Default::default()
        });
        sleep(Duration::from_secs(1)).await;
        voice.shutdown();
    }

    let store = Arc::new(assert_ok!(SqliteStore::new(db_path)));
    assert!(store.get(SETTINGS_KEY).is_some());

    let voice = voice_with(&mock, store);
    let settings = voice.settings();
    assert_eq!(settings.speed, 2.0);
    assert_eq!(settings.volume, 0.4);
    assert_eq!(settings.language, "fr-FR");

    voice.test_voice();
    sleep(Duration::from_millis(10)).await;
    let last = mock.last().expect("test phrase spoken");
    assert_eq!(last.rate, 2.0);
    assert_eq!(last.language, "fr-FR");
}

#[tokio::test(start_paused = true)]
async fn test_disabled_voice_stays_silent() {
    let mock = Arc::new(MockTts::new());
    let voice = voice_with(&mock, Arc::new(farmvoice::storage::MemoryStore::new()));

    voice.update_settings(VoiceSettingsUpdate {
        enabled: Some(false),
        ..Default::default()
    });
    voice.speak("Check the irrigation lines");
    assert!(!voice.is_busy());
    voice.start_listening();
    sleep(Duration::from_secs(1)).await;

    assert!(voice.is_listening());
    assert!(mock.get_spoken().is_empty());
    assert_eq!(voice.caption(), None);
}

#[tokio::test(start_paused = true)]
async fn test_engine_failure_returns_to_idle() {
    let mock = Arc::new(MockTts::new());
    *mock.should_fail.lock().unwrap() = true;
    let voice = voice_with(&mock, Arc::new(farmvoice::storage::MemoryStore::new()));
    let mut events = voice.speech_events();

    voice.speak("Frost expected tonight");
    sleep(Duration::from_millis(50)).await;

    assert!(!voice.is_speaking());
    let mut failed = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, SpeechEvent::Failed { .. }) {
            failed = true;
        }
    }
    assert!(failed);
    assert!(mock.was_spoken("Frost"));
}
