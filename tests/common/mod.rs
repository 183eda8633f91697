//! Shared test utilities
//!
//! Fake collaborators for the four pipeline seams, plus short timings so
//! integration tests finish quickly.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use vesper::backend::ResponseBackend;
use vesper::config::PipelineConfig;
use vesper::voice::{AudioClip, AudioSource, Recognizer, Speaker, SAMPLE_RATE};
use vesper::{Config, Error, Result};

/// A config with the "jarvis" wake word and timings short enough for tests
#[must_use]
pub fn test_config() -> Config {
    Config {
        wake_word: "jarvis".to_string(),
        pipeline: PipelineConfig {
            listen_timeout: Duration::from_millis(100),
            phrase_limit: Duration::from_millis(200),
            error_backoff: Duration::from_millis(20),
            poll_interval: Duration::from_millis(50),
        },
        ..Config::default()
    }
}

/// An audio source that never hears anything
pub struct SilentSource;

impl AudioSource for SilentSource {
    fn listen(&self, timeout: Duration, _phrase_limit: Duration) -> Result<Option<AudioClip>> {
        std::thread::sleep(timeout);
        Ok(None)
    }
}

/// An audio source fed clips through a channel
///
/// `listen` blocks up to the timeout waiting for the next scripted clip,
/// mirroring how the real microphone waits for speech to start.
pub struct ScriptedSource {
    clips: Mutex<std::sync::mpsc::Receiver<Vec<f32>>>,
}

impl ScriptedSource {
    #[must_use]
    pub fn new() -> (std::sync::mpsc::Sender<Vec<f32>>, Self) {
        let (tx, rx) = std::sync::mpsc::channel();
        (
            tx,
            Self {
                clips: Mutex::new(rx),
            },
        )
    }
}

impl AudioSource for ScriptedSource {
    fn listen(&self, timeout: Duration, _phrase_limit: Duration) -> Result<Option<AudioClip>> {
        let rx = self.clips.lock().expect("clip channel poisoned");
        match rx.recv_timeout(timeout) {
            Ok(samples) => Ok(Some(AudioClip {
                samples,
                sample_rate: SAMPLE_RATE,
            })),
            Err(_) => Ok(None),
        }
    }
}

/// A recognizer that replays a fixed script of outcomes
///
/// Each transcription pops the next outcome; an exhausted script reports
/// "not understood".
pub struct ScriptedRecognizer {
    script: Mutex<VecDeque<Result<Option<String>>>>,
}

impl ScriptedRecognizer {
    #[must_use]
    pub fn new(script: Vec<Result<Option<String>>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
        }
    }
}

#[async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn transcribe(&self, _clip: &AudioClip) -> Result<Option<String>> {
        self.script
            .lock()
            .expect("script poisoned")
            .pop_front()
            .unwrap_or(Ok(None))
    }
}

/// A backend that records prompts and answers with a fixed reply
pub struct RecordingBackend {
    pub prompts: Mutex<Vec<String>>,
    pub reply: String,
}

impl RecordingBackend {
    #[must_use]
    pub fn new(reply: &str) -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            reply: reply.to_string(),
        }
    }

    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts poisoned").clone()
    }
}

#[async_trait]
impl ResponseBackend for RecordingBackend {
    async fn generate(&self, command: &str) -> Result<String> {
        self.prompts
            .lock()
            .expect("prompts poisoned")
            .push(command.to_string());
        Ok(self.reply.clone())
    }
}

/// A backend that always fails with the given HTTP status
pub struct FailingBackend {
    pub status: u16,
}

#[async_trait]
impl ResponseBackend for FailingBackend {
    async fn generate(&self, _command: &str) -> Result<String> {
        Err(Error::BackendStatus {
            status: self.status,
            body: "upstream failure".to_string(),
        })
    }
}

/// A backend that records the prompt, then waits for an explicit release
///
/// Lets a test observe the `Thinking` state before the reply lands.
pub struct GatedBackend {
    pub prompts: Mutex<Vec<String>>,
    pub release: Notify,
    pub reply: String,
}

impl GatedBackend {
    #[must_use]
    pub fn new(reply: &str) -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            release: Notify::new(),
            reply: reply.to_string(),
        }
    }
}

#[async_trait]
impl ResponseBackend for GatedBackend {
    async fn generate(&self, command: &str) -> Result<String> {
        self.prompts
            .lock()
            .expect("prompts poisoned")
            .push(command.to_string());
        self.release.notified().await;
        Ok(self.reply.clone())
    }
}

/// A speaker that records what it was asked to say
pub struct RecordingSpeaker {
    pub spoken: Mutex<Vec<String>>,
}

impl RecordingSpeaker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            spoken: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().expect("spoken poisoned").clone()
    }
}

impl Default for RecordingSpeaker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Speaker for RecordingSpeaker {
    async fn speak(&self, text: &str) -> Result<()> {
        self.spoken
            .lock()
            .expect("spoken poisoned")
            .push(text.to_string());
        Ok(())
    }
}

/// Poll until the condition holds or the deadline passes
pub async fn wait_until<F: Fn() -> bool>(condition: F, deadline: Duration) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
