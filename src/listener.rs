//! Capture loop - one listening session
//!
//! Spawned by the command processor on `StartListening`. Each iteration
//! acquires one audio clip on a blocking worker, runs recognition, and feeds
//! recognized utterances back into the command queue. The shared listening
//! flag is checked only at the top of the loop, so cancellation is
//! cooperative and an in-flight acquisition is never interrupted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::event::{CommandSender, Event, StatusNotifier};
use crate::voice::{AudioSource, Recognizer};

/// One listening session's capture loop
pub(crate) struct CaptureSession {
    pub source: Arc<dyn AudioSource>,
    pub recognizer: Arc<dyn Recognizer>,
    pub commands: CommandSender,
    pub notifier: StatusNotifier,
    pub listening: Arc<AtomicBool>,
    pub listen_timeout: Duration,
    pub phrase_limit: Duration,
    pub error_backoff: Duration,
}

impl CaptureSession {
    pub(crate) fn new(
        source: Arc<dyn AudioSource>,
        recognizer: Arc<dyn Recognizer>,
        commands: CommandSender,
        notifier: StatusNotifier,
        listening: Arc<AtomicBool>,
        timing: &PipelineConfig,
    ) -> Self {
        Self {
            source,
            recognizer,
            commands,
            notifier,
            listening,
            listen_timeout: timing.listen_timeout,
            phrase_limit: timing.phrase_limit,
            error_backoff: timing.error_backoff,
        }
    }

    /// Spawn the session as an independent task
    pub(crate) fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        tracing::debug!("capture session started");

        while self.listening.load(Ordering::Acquire) {
            self.notifier.listening(true);
            self.notifier.status("Listening...");

            let source = Arc::clone(&self.source);
            let (timeout, limit) = (self.listen_timeout, self.phrase_limit);
            let acquired =
                tokio::task::spawn_blocking(move || source.listen(timeout, limit)).await;

            match acquired {
                Ok(Ok(Some(clip))) => {
                    self.notifier.status("Processing speech...");

                    match self.recognizer.transcribe(&clip).await {
                        Ok(Some(text)) => {
                            tracing::debug!(transcript = %text, "utterance recognized");
                            if self.commands.send(Event::UtteranceRecognized { text }).is_err() {
                                // Processor gone; nothing left to feed
                                break;
                            }
                        }
                        Ok(None) => {
                            // Audio present but not understood; keep listening
                            self.notifier.status("Listening...");
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "recognition failed");
                            self.notifier.status(format!("Error: {e}"));
                            tokio::time::sleep(self.error_backoff).await;
                        }
                    }
                }
                Ok(Ok(None)) => {
                    // No speech within the window; try again
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "audio acquisition failed");
                    self.notifier.status(format!("Error listening: {e}"));
                    tokio::time::sleep(self.error_backoff).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "audio task failed");
                    self.notifier.status(format!("Error listening: {e}"));
                    tokio::time::sleep(self.error_backoff).await;
                }
            }
        }

        self.notifier.listening(false);
        self.notifier.status("Ready");
        tracing::debug!("capture session stopped");
    }
}
