//! Speech-to-text adapter
//!
//! Talks to a whisper.cpp-server-style transcription endpoint: a multipart
//! upload of WAV audio answered with `{"text": "..."}`.

use std::time::Duration;

use async_trait::async_trait;

use super::{AudioClip, Recognizer};
use crate::{Error, Result};

/// Request timeout for transcription calls
const STT_TIMEOUT: Duration = Duration::from_secs(30);

/// Response from the transcription API
#[derive(serde::Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Transcribes speech via an HTTP transcription service
pub struct HttpRecognizer {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpRecognizer {
    /// Create a new recognizer for the given endpoint
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(url: String, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(STT_TIMEOUT).build()?;

        Ok(Self {
            client,
            url,
            api_key,
        })
    }
}

#[async_trait]
impl Recognizer for HttpRecognizer {
    async fn transcribe(&self, clip: &AudioClip) -> Result<Option<String>> {
        tracing::debug!(
            samples = clip.samples.len(),
            duration_ms = clip.duration().as_millis(),
            "starting transcription"
        );

        let wav = clip.to_wav()?;

        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(wav)
                .file_name("audio.wav")
                .mime_str("audio/wav")
                .map_err(|e| Error::Recognition(e.to_string()))?,
        );

        let mut request = self.client.post(&self.url).multipart(form);
        if let Some(ref key) = self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, "transcription request failed");
            e
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "transcription API error");
            return Err(Error::Recognition(format!("STT error {status}: {body}")));
        }

        let result: TranscriptionResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse transcription response");
            e
        })?;

        let text = result.text.trim();
        if text.is_empty() {
            tracing::debug!("audio not understood");
            return Ok(None);
        }

        tracing::info!(transcript = %text, "transcription complete");
        Ok(Some(text.to_string()))
    }
}
