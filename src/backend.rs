//! Language-model backend adapter
//!
//! Talks to an Ollama-style generate API: `{model, prompt, stream: false}`
//! answered with `{"response": "..."}`. Failures degrade to user-facing reply
//! text in the processor; nothing here is ever fatal to the pipeline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;
use crate::{Error, Result};

/// Reply used when the backend answers without a response field
const EMPTY_RESPONSE_REPLY: &str = "I'm sorry, I couldn't process that request.";

/// Generate request payload
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Generate response payload
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Given a text prompt, returns generated text
#[async_trait]
pub trait ResponseBackend: Send + Sync {
    /// Generate a reply for the user's command
    ///
    /// # Errors
    ///
    /// Returns error on any non-success status or transport failure
    async fn generate(&self, command: &str) -> Result<String>;
}

/// Ollama-style HTTP response backend
pub struct OllamaBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    persona: String,
}

impl OllamaBackend {
    /// Create a new backend client
    ///
    /// The request timeout comes from the configuration; the generate call
    /// itself is otherwise unbounded.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &BackendConfig, persona: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        tracing::debug!(
            endpoint = %config.endpoint,
            model = %config.model,
            "backend client initialized"
        );

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            persona,
        })
    }

    /// Wrap the user's command in the fixed persona template
    fn wrap_prompt(&self, command: &str) -> String {
        format!(
            "You are {}, a helpful AI assistant. Answer briefly and concisely. User query: {command}",
            self.persona
        )
    }
}

#[async_trait]
impl ResponseBackend for OllamaBackend {
    async fn generate(&self, command: &str) -> Result<String> {
        let prompt = self.wrap_prompt(command);
        let request = GenerateRequest {
            model: &self.model,
            prompt: &prompt,
            stream: false,
        };

        tracing::debug!(endpoint = %self.endpoint, command, "sending generate request");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "generate request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "backend returned error status");
            return Err(Error::BackendStatus {
                status: status.as_u16(),
                body,
            });
        }

        let result: GenerateResponse = response.json().await?;

        if result.response.is_empty() {
            tracing::warn!("backend response had no text");
            return Ok(EMPTY_RESPONSE_REPLY.to_string());
        }

        tracing::info!(chars = result.response.len(), "response received");
        Ok(result.response)
    }
}

/// Degrade a backend failure to user-facing reply text
///
/// Spoken back to the user in place of a response; the pipeline never retries
/// and never crashes on a backend failure.
#[must_use]
pub fn error_reply(err: &Error) -> String {
    match err {
        Error::BackendStatus { status, .. } => format!("Error: {status}"),
        other => format!("Error communicating with the AI model: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_backend() -> OllamaBackend {
        OllamaBackend::new(
            &BackendConfig {
                endpoint: "http://localhost:11434/api/generate".to_string(),
                model: "llama3.2:latest".to_string(),
                request_timeout: Duration::from_secs(5),
            },
            "Vesper".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn prompt_template_wraps_command() {
        let backend = test_backend();
        let prompt = backend.wrap_prompt("turn on the lights");

        assert!(prompt.starts_with("You are Vesper, a helpful AI assistant."));
        assert!(prompt.contains("Answer briefly and concisely."));
        assert!(prompt.ends_with("User query: turn on the lights"));
    }

    #[test]
    fn request_payload_matches_protocol() {
        let request = GenerateRequest {
            model: "llama3.2:latest",
            prompt: "hello",
            stream: false,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "llama3.2:latest");
        assert_eq!(value["prompt"], "hello");
        assert_eq!(value["stream"], false);
    }

    #[test]
    fn missing_response_field_parses_to_empty() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.response.is_empty());
    }

    #[test]
    fn status_failure_degrades_to_error_code_reply() {
        let err = Error::BackendStatus {
            status: 500,
            body: "internal".to_string(),
        };
        assert_eq!(error_reply(&err), "Error: 500");
    }

    #[test]
    fn other_failures_degrade_to_diagnostic_reply() {
        let err = Error::Config("bad endpoint".to_string());
        let reply = error_reply(&err);
        assert!(reply.starts_with("Error communicating with the AI model:"));
        assert!(reply.contains("bad endpoint"));
    }
}
