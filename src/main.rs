//! FarmVoice - voice-driven farming assistant
//!
//! Command line front end for the voice layer and the advisory engine.

use anyhow::Result;
use clap::{Parser, Subcommand};
use farmvoice::chat::ChatSession;
use farmvoice::config::Config;
use farmvoice::hotkeys;
use farmvoice::settings::{VoiceSettingsUpdate, SUPPORTED_LANGUAGES};
use farmvoice::speech::SpeechEvent;
use farmvoice::storage::{KeyValueStore, MemoryStore, SqliteStore};
use farmvoice::tts;
use farmvoice::voice::VoiceContext;
use farmvoice::weather::{self, WeatherClient, WeatherSnapshot};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Longest we wait for a single utterance before exiting anyway
const SPEECH_WAIT: Duration = Duration::from_secs(120);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask the farming assistant one question and hear the answer
    Ask {
        query: String,
        /// Location used for weather-aware answers
        #[arg(short, long)]
        location: Option<String>,
    },
    /// Interactive chat; Alt+V toggles listening, Alt+S stops speech
    Chat {
        #[arg(short, long)]
        location: Option<String>,
    },
    /// Show and announce the current weather for a location
    Weather { location: String },
    /// Speak a line of text with the current voice settings
    Speak { text: String },
    /// Inspect or change voice settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Inspect or write the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the effective configuration to disk
    Init,
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    /// Print the current voice settings
    Show,
    /// Change one or more voice settings
    Set {
        #[arg(long)]
        enabled: Option<bool>,
        /// Speech rate, clamped to 0.5..=2.0
        #[arg(long)]
        speed: Option<f32>,
        #[arg(long)]
        pitch: Option<f32>,
        /// Volume, clamped to 0..=1
        #[arg(long)]
        volume: Option<f32>,
        /// Language code such as en-US
        #[arg(long)]
        language: Option<String>,
    },
    /// Speak the test phrase
    Test,
    /// List supported language codes
    Languages,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Setup logging: RUST_LOG wins, then --verbose, then the config level
    let level = if args.verbose {
        "debug".to_string()
    } else {
        config.log_level.to_lowercase()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("🌱 FarmVoice v{} starting...", env!("CARGO_PKG_VERSION"));

    let store = open_store(&config);
    let engine = tts::create_engine(&config).await;
    let voice = VoiceContext::new(store, engine, config.subtitle_decay());

    let result = run(args.command, &config, args.config.as_deref(), &voice).await;
    voice.shutdown();
    result
}

fn open_store(config: &Config) -> Arc<dyn KeyValueStore> {
    match SqliteStore::new(PathBuf::from(&config.storage_path)) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(
                "⚠️ Could not open store at {} ({}), settings will not persist",
                config.storage_path, e
            );
            Arc::new(MemoryStore::new())
        }
    }
}

async fn run(
    command: Command,
    config: &Config,
    config_file: Option<&Path>,
    voice: &VoiceContext,
) -> Result<()> {
    match command {
        Command::Ask { query, location } => {
            let snapshot = load_weather(config, voice, location.as_deref(), false).await?;
            let mut chat = ChatSession::new();
            if let Some(reply) = chat.send(&query, snapshot.as_ref()) {
                println!("{}", reply.content);
                let content = reply.content.clone();
                speak_and_wait(voice, &content).await;
            }
        }
        Command::Chat { location } => {
            let snapshot = load_weather(config, voice, location.as_deref(), true).await?;
            chat_loop(voice, snapshot).await?;
        }
        Command::Weather { location } => {
            let snapshot = load_weather(config, voice, Some(&location), true).await?;
            if let Some(snapshot) = snapshot {
                print_weather(&snapshot);
            }
        }
        Command::Speak { text } => {
            speak_and_wait(voice, &text).await;
        }
        Command::Settings { action } => match action {
            SettingsAction::Show => {
                println!("{}", serde_json::to_string_pretty(&voice.settings())?);
            }
            SettingsAction::Set {
                enabled,
                speed,
                pitch,
                volume,
                language,
            } => {
                let update = VoiceSettingsUpdate {
                    enabled,
                    speed,
                    pitch,
                    volume,
                    language,
                };
                if update.is_empty() {
                    warn!("No settings given, nothing to change");
                }
                let mut events = voice.speech_events();
                let settings = voice.update_settings(update);
                println!("{}", serde_json::to_string_pretty(&settings)?);
                wait_for_speech(voice, &mut events).await;
            }
            SettingsAction::Test => {
                let mut events = voice.speech_events();
                voice.test_voice();
                wait_for_speech(voice, &mut events).await;
            }
            SettingsAction::Languages => {
                for (code, label) in SUPPORTED_LANGUAGES {
                    println!("{:<6} {}", code, label);
                }
            }
        },
        Command::Config { action } => match action {
            ConfigAction::Show => {
                println!("{}", serde_json::to_string_pretty(config)?);
            }
            ConfigAction::Init => {
                let path = match config_file {
                    Some(path) => {
                        config.save_to(path)?;
                        path.to_path_buf()
                    }
                    None => {
                        config.save()?;
                        farmvoice::config::config_path()
                    }
                };
                info!("💾 Config written to {}", path.display());
                println!("{}", path.display());
            }
        },
    }
    Ok(())
}

/// Fetch weather for the given or configured location, announcing progress
async fn load_weather(
    config: &Config,
    voice: &VoiceContext,
    location: Option<&str>,
    announce: bool,
) -> Result<Option<WeatherSnapshot>> {
    let location = location
        .map(str::to_string)
        .unwrap_or_else(|| config.default_location.clone());
    let location = location.trim();
    if location.is_empty() {
        return Ok(None);
    }

    let client = WeatherClient::new(config)?;
    if announce {
        voice.speak(&weather::fetching_announcement(location));
    }

    let snapshot = client.lookup(location).await;
    if announce {
        match &snapshot {
            Some(snapshot) => speak_and_wait(voice, &weather::loaded_announcement(snapshot)).await,
            None => speak_and_wait(voice, weather::UNAVAILABLE_ANNOUNCEMENT).await,
        }
    }
    Ok(snapshot)
}

fn print_weather(snapshot: &WeatherSnapshot) {
    println!(
        "{}: {}°C, {}, humidity {}%, wind {} km/h",
        snapshot.location,
        snapshot.temperature,
        snapshot.condition,
        snapshot.humidity,
        snapshot.wind_speed
    );
    println!("{}", snapshot.forecast);
    for alert in &snapshot.alerts {
        println!("⚠️  {}: {}", alert.title, alert.message);
    }
    for advice in &snapshot.farming_advice {
        println!("🌾 {} - {}", advice.title, advice.description);
    }
}

async fn speak_and_wait(voice: &VoiceContext, text: &str) {
    let mut events = voice.speech_events();
    voice.speak(text);
    wait_for_speech(voice, &mut events).await;
}

/// Wait until the latest utterance ends; returns at once when nothing was started
async fn wait_for_speech(
    voice: &VoiceContext,
    events: &mut tokio::sync::broadcast::Receiver<SpeechEvent>,
) {
    if !voice.is_busy() {
        return;
    }
    let finished = async {
        loop {
            match events.recv().await {
                Ok(SpeechEvent::Ended { .. }) | Ok(SpeechEvent::Failed { .. }) => break,
                Ok(SpeechEvent::Started { .. }) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    };
    if tokio::time::timeout(SPEECH_WAIT, finished).await.is_err() {
        warn!("Speech did not finish within {:?}", SPEECH_WAIT);
    }
}

async fn chat_loop(voice: &VoiceContext, snapshot: Option<WeatherSnapshot>) -> Result<()> {
    let mut chat = ChatSession::new();
    let mut shortcuts = hotkeys::spawn_listener();
    let mut captions = voice.subscribe_caption();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    for message in chat.messages() {
        println!("🤖 {}", message.content);
    }
    println!("Type a question, or 'quit' to leave.");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if matches!(line.trim(), "quit" | "exit") {
                    break;
                }
                if let Some(reply) = chat.send(&line, snapshot.as_ref()) {
                    println!("🤖 {}", reply.content);
                    voice.speak(&reply.content);
                }
            }
            Some(shortcut) = shortcuts.recv() => {
                voice.handle_shortcut(shortcut);
                println!(
                    "🎙️ Listening: {}",
                    if voice.is_listening() { "on" } else { "off" }
                );
            }
            Ok(()) = captions.changed() => {
                if let Some(caption) = captions.borrow_and_update().caption() {
                    println!("💬 {}", caption);
                }
            }
        }
    }

    voice.stop_speaking();
    Ok(())
}
