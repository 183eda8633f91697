//! Command processor - owns the assistant state machine
//!
//! Single consumer of the command queue. Applies the wake-word gate, drives
//! the response backend, hands replies to the speaker, and publishes every
//! state change through a watch channel. A failure while handling one event
//! is logged and never terminates the consumer loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio::time::timeout;

use crate::backend::{self, ResponseBackend};
use crate::config::Config;
use crate::event::{
    AssistantState, CommandReceiver, CommandSender, Event, StatusNotifier,
};
use crate::listener::CaptureSession;
use crate::voice::{AudioSource, Recognizer, Speaker};
use crate::Result;

/// The command processor task
pub struct CommandProcessor {
    config: Arc<Config>,
    commands: CommandReceiver,
    command_tx: CommandSender,
    notifier: StatusNotifier,
    state: watch::Sender<AssistantState>,
    listening: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    continuous: bool,
    source: Arc<dyn AudioSource>,
    recognizer: Arc<dyn Recognizer>,
    backend: Arc<dyn ResponseBackend>,
    speaker: Arc<dyn Speaker>,
}

impl CommandProcessor {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        config: Arc<Config>,
        commands: CommandReceiver,
        command_tx: CommandSender,
        notifier: StatusNotifier,
        state: watch::Sender<AssistantState>,
        listening: Arc<AtomicBool>,
        running: Arc<AtomicBool>,
        source: Arc<dyn AudioSource>,
        recognizer: Arc<dyn Recognizer>,
        backend: Arc<dyn ResponseBackend>,
        speaker: Arc<dyn Speaker>,
    ) -> Self {
        Self {
            config,
            commands,
            command_tx,
            notifier,
            state,
            listening,
            running,
            continuous: false,
            source,
            recognizer,
            backend,
            speaker,
        }
    }

    /// Run until shutdown is requested or the queue closes
    ///
    /// Dequeues with a bounded timeout so the running flag is observed even
    /// when no events arrive.
    pub async fn run(mut self) {
        tracing::debug!("command processor started");

        while self.running.load(Ordering::Acquire) {
            match timeout(self.config.pipeline.poll_interval, self.commands.recv()).await {
                Ok(Some(event)) => {
                    if let Err(e) = self.handle(event).await {
                        // One bad event must never take down the consumer
                        tracing::error!(error = %e, "error handling command");
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    // Dequeue timeout; loop to re-check the running flag
                }
            }
        }

        tracing::debug!("command processor stopped");
    }

    async fn handle(&mut self, event: Event) -> Result<()> {
        match event {
            Event::StartListening => self.start_listening(),
            Event::StopListening => self.stop_listening(),
            Event::UtteranceRecognized { text } => self.handle_utterance(&text).await?,
        }

        Ok(())
    }

    /// Begin a listening session
    ///
    /// A duplicate `StartListening` while already listening is legal: it
    /// spawns a fresh capture session against the same shared flag and leaves
    /// the observed state at `Listening`.
    fn start_listening(&self) {
        self.listening.store(true, Ordering::Release);
        self.set_state(AssistantState::Listening);

        CaptureSession::new(
            Arc::clone(&self.source),
            Arc::clone(&self.recognizer),
            self.command_tx.clone(),
            self.notifier.clone(),
            Arc::clone(&self.listening),
            &self.config.pipeline,
        )
        .spawn();
    }

    /// End the current listening session
    ///
    /// Clears the shared flag; capture loops observe it at the top of their
    /// next iteration. Continuous listening disengages with the session.
    fn stop_listening(&mut self) {
        self.listening.store(false, Ordering::Release);
        self.continuous = false;
        self.set_state(AssistantState::Idle);
    }

    async fn handle_utterance(&mut self, text: &str) -> Result<()> {
        let Some(command) = self.gate(text) else {
            return Ok(());
        };

        self.set_state(AssistantState::Thinking);
        self.notifier.thinking(true);
        self.notifier.status(format!("Processing: {command}"));

        // Synchronous from the processor's point of view: the queue waits
        let reply = match self.backend.generate(&command).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "backend request failed");
                backend::error_reply(&e)
            }
        };

        self.set_state(AssistantState::Responding);
        self.notifier.thinking(false);
        self.notifier.status(format!("Responding: {reply}"));

        // Fire-and-forget: speech must not block the next queue event
        let speaker = Arc::clone(&self.speaker);
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            match speaker.speak(&reply).await {
                Ok(()) => notifier.status("Ready"),
                Err(e) => {
                    tracing::warn!(error = %e, "speech synthesis failed");
                    notifier.status(format!("Speech error: {e}"));
                }
            }
        });

        let next = if self.listening.load(Ordering::Acquire) {
            AssistantState::Listening
        } else {
            AssistantState::Idle
        };
        self.set_state(next);

        Ok(())
    }

    /// Wake-word gate
    ///
    /// Returns the command remainder for accepted utterances. An utterance
    /// passes when continuous listening is already engaged or when its
    /// lowercase text contains the wake word anywhere as a substring.
    /// Acceptance engages continuous listening for the rest of the session;
    /// an empty remainder is discarded with no backend call.
    fn gate(&mut self, text: &str) -> Option<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }

        let wake_word = &self.config.wake_word;
        if !self.continuous && !contains_wake_word(trimmed, wake_word) {
            tracing::debug!(transcript = %trimmed, "utterance without wake word ignored");
            return None;
        }

        self.continuous = true;

        let command = strip_wake_word(trimmed, wake_word);
        if command.is_empty() {
            tracing::debug!("bare wake word, nothing to do");
            return None;
        }

        tracing::info!(command = %command, "command accepted");
        Some(command)
    }

    fn set_state(&self, next: AssistantState) {
        let prev = *self.state.borrow();
        if prev != next {
            tracing::debug!(?prev, ?next, "state transition");
        }
        self.state.send_replace(next);
    }
}

/// Check whether the lowercase text contains the wake word as a substring
///
/// Matches anywhere in the utterance, not only as a prefix.
#[must_use]
pub fn contains_wake_word(text: &str, wake_word: &str) -> bool {
    text.to_lowercase().contains(&wake_word.to_lowercase())
}

/// Remove the first occurrence of the wake word, case-insensitively, and trim
/// surrounding whitespace
///
/// The remainder keeps its original casing and inner spacing.
#[must_use]
pub fn strip_wake_word(text: &str, wake_word: &str) -> String {
    let lower = text.to_lowercase();
    let wake = wake_word.to_lowercase();

    let Some(pos) = lower.find(&wake) else {
        return text.trim().to_string();
    };

    let end = pos + wake.len();
    if !text.is_char_boundary(pos) || !text.is_char_boundary(end) {
        // Lowercasing shifted byte offsets (non-ASCII text); leave it intact
        return text.trim().to_string();
    }

    let mut remainder = String::with_capacity(text.len());
    remainder.push_str(&text[..pos]);
    remainder.push_str(&text[end..]);
    remainder.trim().to_string()
}
