//! Configuration management
//!
//! Supports `~/.config/vesper/config.toml` as a persistent config source.
//! All fields in the file are optional — it is a partial overlay on top of
//! defaults, with CLI/env overrides applied last by the binary. Configuration
//! is fixed at startup and passed by reference to each component; nothing is
//! hot-reloadable.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result};

/// Default Ollama-style generate endpoint
const DEFAULT_ENDPOINT: &str = "http://localhost:11434/api/generate";

/// Default model identifier
const DEFAULT_MODEL: &str = "llama3.2:latest";

/// Default wake word
const DEFAULT_WAKE_WORD: &str = "vesper";

/// Default backend request timeout
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Default whisper.cpp-style transcription endpoint
const DEFAULT_STT_URL: &str = "http://localhost:8080/inference";

/// Default OpenAI-style speech synthesis endpoint
const DEFAULT_TTS_URL: &str = "http://localhost:8880/v1/audio/speech";

/// Assistant configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Assistant name used in the prompt template
    pub persona: String,

    /// Wake word that gates utterances
    pub wake_word: String,

    /// Response backend configuration
    pub backend: BackendConfig,

    /// STT/TTS adapter configuration
    pub voice: VoiceConfig,

    /// Pipeline timing configuration
    pub pipeline: PipelineConfig,
}

/// Response backend configuration
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Generate endpoint URL
    pub endpoint: String,

    /// Model identifier
    pub model: String,

    /// Request timeout for generation calls
    pub request_timeout: Duration,
}

/// Speech adapter configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Transcription endpoint URL (whisper.cpp server style)
    pub stt_url: String,

    /// Speech synthesis endpoint URL (OpenAI style)
    pub tts_url: String,

    /// TTS model identifier
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier
    pub tts_speed: f64,
}

/// Pipeline timing configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Bounded wait for speech to start in one listen attempt
    pub listen_timeout: Duration,

    /// Maximum length of one captured utterance
    pub phrase_limit: Duration,

    /// Pause after a capture/recognition failure before retrying
    pub error_backoff: Duration,

    /// Dequeue timeout for the processor's shutdown checks
    pub poll_interval: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            stt_url: DEFAULT_STT_URL.to_string(),
            tts_url: DEFAULT_TTS_URL.to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            tts_speed: 1.0,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            listen_timeout: Duration::from_secs(5),
            phrase_limit: Duration::from_secs(10),
            error_backoff: Duration::from_secs(1),
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            persona: "Vesper".to_string(),
            wake_word: DEFAULT_WAKE_WORD.to_string(),
            backend: BackendConfig::default(),
            voice: VoiceConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the standard config file, falling back to
    /// defaults for anything the file omits
    ///
    /// # Errors
    ///
    /// Returns error if the resulting configuration is invalid
    pub fn load() -> Result<Self> {
        let config = Self::from_file(load_config_file());
        config.validate()?;
        Ok(config)
    }

    /// Build a config from a parsed overlay file
    #[must_use]
    pub fn from_file(file: ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            persona: file.persona.unwrap_or(defaults.persona),
            wake_word: file.wake_word.unwrap_or(defaults.wake_word),
            backend: BackendConfig {
                endpoint: file.backend.endpoint.unwrap_or(defaults.backend.endpoint),
                model: file.backend.model.unwrap_or(defaults.backend.model),
                request_timeout: file
                    .backend
                    .request_timeout_secs
                    .map_or(defaults.backend.request_timeout, Duration::from_secs),
            },
            voice: VoiceConfig {
                stt_url: file.voice.stt_url.unwrap_or(defaults.voice.stt_url),
                tts_url: file.voice.tts_url.unwrap_or(defaults.voice.tts_url),
                tts_model: file.voice.tts_model.unwrap_or(defaults.voice.tts_model),
                tts_voice: file.voice.tts_voice.unwrap_or(defaults.voice.tts_voice),
                tts_speed: file.voice.tts_speed.unwrap_or(defaults.voice.tts_speed),
            },
            pipeline: PipelineConfig {
                listen_timeout: file
                    .pipeline
                    .listen_timeout_secs
                    .map_or(defaults.pipeline.listen_timeout, Duration::from_secs),
                phrase_limit: file
                    .pipeline
                    .phrase_limit_secs
                    .map_or(defaults.pipeline.phrase_limit, Duration::from_secs),
                error_backoff: file
                    .pipeline
                    .error_backoff_ms
                    .map_or(defaults.pipeline.error_backoff, Duration::from_millis),
                poll_interval: file
                    .pipeline
                    .poll_interval_ms
                    .map_or(defaults.pipeline.poll_interval, Duration::from_millis),
            },
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if the wake word is empty or an endpoint is not an
    /// HTTP(S) URL
    pub fn validate(&self) -> Result<()> {
        if self.wake_word.trim().is_empty() {
            return Err(Error::Config("wake word must not be empty".to_string()));
        }

        for (name, url) in [
            ("backend.endpoint", &self.backend.endpoint),
            ("voice.stt_url", &self.voice.stt_url),
            ("voice.tts_url", &self.voice.tts_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Error::Config(format!(
                    "{name}: '{url}' must start with http:// or https://"
                )));
            }
        }

        Ok(())
    }
}

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// Assistant persona name
    #[serde(default)]
    pub persona: Option<String>,

    /// Wake word
    #[serde(default)]
    pub wake_word: Option<String>,

    /// Backend configuration
    #[serde(default)]
    pub backend: BackendFileConfig,

    /// Speech adapter configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Pipeline timing configuration
    #[serde(default)]
    pub pipeline: PipelineFileConfig,
}

/// Backend-related file configuration
#[derive(Debug, Default, Deserialize)]
pub struct BackendFileConfig {
    /// Generate endpoint URL
    pub endpoint: Option<String>,

    /// Model identifier
    pub model: Option<String>,

    /// Request timeout in seconds
    pub request_timeout_secs: Option<u64>,
}

/// Speech adapter file configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    pub stt_url: Option<String>,
    pub tts_url: Option<String>,
    pub tts_model: Option<String>,
    pub tts_voice: Option<String>,
    pub tts_speed: Option<f64>,
}

/// Pipeline timing file configuration
#[derive(Debug, Default, Deserialize)]
pub struct PipelineFileConfig {
    /// Seconds to wait for speech to start
    pub listen_timeout_secs: Option<u64>,

    /// Maximum utterance length in seconds
    pub phrase_limit_secs: Option<u64>,

    /// Failure backoff in milliseconds
    pub error_backoff_ms: Option<u64>,

    /// Processor dequeue timeout in milliseconds
    pub poll_interval_ms: Option<u64>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ConfigFile::default()` if the file doesn't exist or can't be
/// parsed.
#[must_use]
pub fn load_config_file() -> ConfigFile {
    let Some(path) = config_file_path() else {
        return ConfigFile::default();
    };

    if !path.exists() {
        return ConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/vesper/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("vesper").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.wake_word, "vesper");
        assert_eq!(config.backend.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.pipeline.listen_timeout, Duration::from_secs(5));
        assert_eq!(config.pipeline.phrase_limit, Duration::from_secs(10));
        assert_eq!(config.pipeline.error_backoff, Duration::from_secs(1));
    }

    #[test]
    fn file_overlay_keeps_defaults_for_omitted_fields() {
        let file: ConfigFile = toml::from_str(
            r#"
            wake_word = "jarvis"

            [backend]
            model = "phi3:instruct"
            "#,
        )
        .unwrap();

        let config = Config::from_file(file);
        assert_eq!(config.wake_word, "jarvis");
        assert_eq!(config.backend.model, "phi3:instruct");
        assert_eq!(config.backend.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.voice.tts_voice, "alloy");
    }

    #[test]
    fn pipeline_timings_parse_from_file() {
        let file: ConfigFile = toml::from_str(
            r"
            [pipeline]
            listen_timeout_secs = 2
            error_backoff_ms = 250
            ",
        )
        .unwrap();

        let config = Config::from_file(file);
        assert_eq!(config.pipeline.listen_timeout, Duration::from_secs(2));
        assert_eq!(config.pipeline.error_backoff, Duration::from_millis(250));
        assert_eq!(config.pipeline.phrase_limit, Duration::from_secs(10));
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        let config = Config {
            backend: BackendConfig {
                endpoint: "localhost:11434".to_string(),
                ..BackendConfig::default()
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_wake_word_is_rejected() {
        let config = Config {
            wake_word: "  ".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
