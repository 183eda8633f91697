//! Audio capture, playback, and speech adapters
//!
//! The pipeline talks to its collaborators through the traits in this module;
//! the concrete implementations wrap a cpal microphone, a whisper.cpp-style
//! transcription API, and an OpenAI-style speech API.

mod mic;
mod playback;
mod stt;
mod tts;

use std::time::Duration;

use async_trait::async_trait;

pub use mic::{MicSource, SAMPLE_RATE, samples_to_wav};
pub use playback::AudioPlayback;
pub use stt::HttpRecognizer;
pub use tts::{HttpSpeaker, TextToSpeech};

use crate::Result;

/// One captured utterance worth of audio
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Mono samples in `[-1.0, 1.0]`
    pub samples: Vec<f32>,

    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioClip {
    /// Duration of the clip
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }

    /// Whether the clip holds no samples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Encode the clip as 16-bit mono WAV bytes for STT APIs
    ///
    /// # Errors
    ///
    /// Returns error if WAV encoding fails
    pub fn to_wav(&self) -> Result<Vec<u8>> {
        samples_to_wav(&self.samples, self.sample_rate)
    }
}

/// Produces one audio clip per listen attempt
///
/// `listen` is a blocking call; the capture loop runs it on a blocking
/// worker. The microphone must be exclusively acquired for the duration of
/// the call and released before it returns.
pub trait AudioSource: Send + Sync {
    /// Wait up to `timeout` for speech to start, then record at most
    /// `phrase_limit` of audio
    ///
    /// Returns `Ok(None)` when no speech started within the timeout; that is
    /// an ordinary outcome, not an error.
    ///
    /// # Errors
    ///
    /// Returns error if the audio device fails
    fn listen(&self, timeout: Duration, phrase_limit: Duration) -> Result<Option<AudioClip>>;
}

/// Converts an audio clip to text
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Transcribe a clip
    ///
    /// Returns `Ok(None)` when audio was present but not understood.
    ///
    /// # Errors
    ///
    /// Returns error if the recognition service fails
    async fn transcribe(&self, clip: &AudioClip) -> Result<Option<String>>;
}

/// Speaks text aloud
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Synthesize and play the given text, returning once playback finishes
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    async fn speak(&self, text: &str) -> Result<()>;
}
