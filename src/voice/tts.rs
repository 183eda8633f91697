//! Text-to-speech adapter
//!
//! Synthesizes speech through an OpenAI-style speech endpoint and plays the
//! MP3 result on the default output device.

use std::time::Duration;

use async_trait::async_trait;

use super::{AudioPlayback, Speaker};
use crate::config::VoiceConfig;
use crate::{Error, Result};

/// Request timeout for synthesis calls
const TTS_TIMEOUT: Duration = Duration::from_secs(30);

/// Synthesizes speech from text
pub struct TextToSpeech {
    client: reqwest::Client,
    url: String,
    model: String,
    voice: String,
    speed: f64,
}

impl TextToSpeech {
    /// Create a new TTS client
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &VoiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(TTS_TIMEOUT).build()?;

        Ok(Self {
            client,
            url: config.tts_url.clone(),
            model: config.tts_model.clone(),
            voice: config.tts_voice.clone(),
            speed: config.tts_speed,
        })
    }

    /// Synthesize text to speech
    ///
    /// # Returns
    ///
    /// Audio bytes (MP3 format)
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct SpeechRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f64,
        }

        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
        };

        let response = self.client.post(&self.url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Speech(format!("TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }
}

/// Speaks text through the TTS service and the default output device
pub struct HttpSpeaker {
    tts: TextToSpeech,
}

impl HttpSpeaker {
    /// Create a new speaker for the given voice configuration
    ///
    /// # Errors
    ///
    /// Returns error if the TTS client cannot be built
    pub fn new(config: &VoiceConfig) -> Result<Self> {
        Ok(Self {
            tts: TextToSpeech::new(config)?,
        })
    }
}

#[async_trait]
impl Speaker for HttpSpeaker {
    async fn speak(&self, text: &str) -> Result<()> {
        tracing::debug!(text, "speaking");

        let audio = self.tts.synthesize(text).await?;

        // cpal streams aren't Send; playback runs whole on a blocking worker
        tokio::task::spawn_blocking(move || AudioPlayback::new()?.play_mp3(&audio))
            .await
            .map_err(|e| Error::Speech(format!("playback task failed: {e}")))?
    }
}
