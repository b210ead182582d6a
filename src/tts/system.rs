//! System fallback TTS engine

use super::{find_in_path, TtsEngine, Utterance};
use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, warn};

/// Command line synthesizer found on the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemProgram {
    /// speech-dispatcher client
    SpdSay,
    EspeakNg,
}

impl SystemProgram {
    pub fn binary(self) -> &'static str {
        match self {
            SystemProgram::SpdSay => "spd-say",
            SystemProgram::EspeakNg => "espeak-ng",
        }
    }

    /// Translate speech parameters into this program's arguments
    pub fn args(self, utterance: &Utterance) -> Vec<String> {
        match self {
            SystemProgram::SpdSay => {
                // spd-say scales everything to -100..=100 around a neutral 0
                let rate = ((utterance.rate - 1.0) * 100.0).clamp(-100.0, 100.0).round() as i32;
                let pitch = ((utterance.pitch - 1.0) * 100.0).clamp(-100.0, 100.0).round() as i32;
                let volume = (utterance.volume * 200.0 - 100.0).clamp(-100.0, 100.0).round() as i32;
                let language = utterance
                    .language
                    .split('-')
                    .next()
                    .unwrap_or("en")
                    .to_lowercase();
                vec![
                    "--wait".to_string(),
                    "-r".to_string(),
                    rate.to_string(),
                    "-p".to_string(),
                    pitch.to_string(),
                    "-i".to_string(),
                    volume.to_string(),
                    "-l".to_string(),
                    language,
                    "--".to_string(),
                    utterance.text.clone(),
                ]
            }
            SystemProgram::EspeakNg => {
                let words_per_minute = (175.0 * utterance.rate).round() as i32;
                let pitch = (50.0 * utterance.pitch).clamp(0.0, 99.0).round() as i32;
                let amplitude = (100.0 * utterance.volume).clamp(0.0, 200.0).round() as i32;
                vec![
                    "-s".to_string(),
                    words_per_minute.to_string(),
                    "-p".to_string(),
                    pitch.to_string(),
                    "-a".to_string(),
                    amplitude.to_string(),
                    "-v".to_string(),
                    utterance.language.to_lowercase(),
                    "--".to_string(),
                    utterance.text.clone(),
                ]
            }
        }
    }
}

#[derive(Debug)]
pub struct SystemEngine {
    program: SystemProgram,
    binary: PathBuf,
}

impl SystemEngine {
    /// Use `binary` as the executable for `program`
    pub fn new(program: SystemProgram, binary: PathBuf) -> Self {
        Self { program, binary }
    }

    /// Probe for spd-say, then espeak-ng
    pub fn detect() -> Option<Self> {
        [SystemProgram::SpdSay, SystemProgram::EspeakNg]
            .into_iter()
            .find_map(|program| find_in_path(program.binary()).map(|binary| Self::new(program, binary)))
    }

    pub fn program(&self) -> SystemProgram {
        self.program
    }
}

#[async_trait]
impl TtsEngine for SystemEngine {
    async fn speak(&self, utterance: &Utterance) -> Result<()> {
        debug!("System speaking: {}", utterance.text);

        // Dropping the future (cancelled utterance) kills the child
        let status = Command::new(&self.binary)
            .args(self.program.args(utterance))
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run {}: {}", self.program.binary(), e))?;

        if !status.success() {
            return Err(anyhow::anyhow!(
                "{} failed with status {}",
                self.program.binary(),
                status
            ));
        }
        Ok(())
    }

    fn cancel(&self) {
        // speech-dispatcher keeps playing after its client dies. Wait for the
        // cancel to land so it cannot hit the utterance started next.
        if self.program == SystemProgram::SpdSay {
            match std::process::Command::new(&self.binary).arg("-C").status() {
                Ok(status) if !status.success() => {
                    warn!("spd-say -C exited with {}", status);
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to cancel speech-dispatcher output: {}", e),
            }
        }
    }

    fn name(&self) -> &str {
        "system"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::VoiceSettings;

    fn utterance(speed: f32, pitch: f32, volume: f32) -> Utterance {
        let settings = VoiceSettings {
            enabled: true,
            speed,
            pitch,
            volume,
            language: "en-GB".to_string(),
        };
        Utterance::new("rain expected", &settings)
    }

    #[test]
    fn test_spd_say_args() {
        let args = SystemProgram::SpdSay.args(&utterance(2.0, 1.0, 0.5));
        assert_eq!(
            args,
            vec!["--wait", "-r", "100", "-p", "0", "-i", "0", "-l", "en", "--", "rain expected"]
        );
    }

    #[test]
    fn test_espeak_args() {
        let args = SystemProgram::EspeakNg.args(&utterance(0.5, 2.0, 1.0));
        assert_eq!(
            args,
            vec!["-s", "88", "-p", "99", "-a", "100", "-v", "en-gb", "--", "rain expected"]
        );
    }

    #[test]
    fn test_text_with_leading_dash_is_not_an_option() {
        let mut utterance = utterance(1.0, 1.0, 1.0);
        utterance.text = "-5 degrees tonight".to_string();
        for program in [SystemProgram::SpdSay, SystemProgram::EspeakNg] {
            let args = program.args(&utterance);
            let n = args.len();
            assert_eq!(args[n - 2], "--");
            assert_eq!(args[n - 1], "-5 degrees tonight");
        }
    }

    /// Fake spd-say that appends its arguments to `log`, taking a while to
    /// "speak" unless asked to cancel
    fn fake_spd_say(dir: &std::path::Path, log: &std::path::Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("spd-say");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\necho \"$*\" >> {}\n[ \"$1\" = \"-C\" ] || sleep 1\n",
                log.display()
            ),
        )
        .expect("Failed to write script");
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
            .expect("Failed to chmod script");
        script
    }

    #[tokio::test]
    async fn test_cancel_lands_before_replacement_starts() {
        use crate::speech::SpeechOutput;
        use std::sync::Arc;
        use std::time::Duration;
        use tokio::sync::watch;

        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let log = dir.path().join("calls.log");
        let engine = SystemEngine::new(SystemProgram::SpdSay, fake_spd_say(dir.path(), &log));
        let (_settings_tx, settings_rx) = watch::channel(VoiceSettings::default());
        let speech = SpeechOutput::new(Some(Arc::new(engine)), settings_rx);

        for _ in 0..5 {
            speech.speak("AAA");
            tokio::time::sleep(Duration::from_millis(100)).await;
            speech.speak("BBB");
            tokio::time::sleep(Duration::from_millis(100)).await;
            speech.stop();
        }

        let calls = std::fs::read_to_string(&log).expect("Failed to read log");
        let calls: Vec<&str> = calls.lines().collect();
        assert_eq!(calls.len(), 20, "{:?}", calls);
        for round in calls.chunks(4) {
            assert!(round[0].ends_with("AAA"), "{:?}", round);
            assert_eq!(round[1], "-C");
            assert!(round[2].ends_with("BBB"), "{:?}", round);
            assert_eq!(round[3], "-C");
        }
    }

    #[tokio::test]
    async fn test_no_cancel_issued_when_nothing_is_speaking() {
        use crate::speech::SpeechOutput;
        use std::sync::Arc;
        use tokio::sync::watch;

        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let log = dir.path().join("calls.log");
        let engine = SystemEngine::new(SystemProgram::SpdSay, fake_spd_say(dir.path(), &log));
        let (_settings_tx, settings_rx) = watch::channel(VoiceSettings::default());
        let speech = SpeechOutput::new(Some(Arc::new(engine)), settings_rx);

        speech.stop();
        speech.stop();
        assert!(!log.exists());
    }
}
