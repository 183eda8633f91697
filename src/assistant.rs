//! Assistant wiring
//!
//! Assembles the pipeline - capture, recognition, backend, speech - around the
//! command queue and hands back a control surface. The handle enqueues
//! commands; only the processor task mutates state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::backend::{OllamaBackend, ResponseBackend};
use crate::config::Config;
use crate::event::{self, AssistantState, CommandSender, Event, StatusEvent, StatusNotifier};
use crate::processor::CommandProcessor;
use crate::voice::{AudioSource, HttpRecognizer, HttpSpeaker, MicSource, Recognizer, Speaker};
use crate::Result;

/// The assembled but not yet running pipeline
pub struct Assistant {
    config: Arc<Config>,
    source: Arc<dyn AudioSource>,
    recognizer: Arc<dyn Recognizer>,
    backend: Arc<dyn ResponseBackend>,
    speaker: Arc<dyn Speaker>,
}

impl Assistant {
    /// Assemble the pipeline with custom collaborators
    ///
    /// Front-ends and tests can substitute any of the four seams.
    pub fn new(
        config: Config,
        source: Arc<dyn AudioSource>,
        recognizer: Arc<dyn Recognizer>,
        backend: Arc<dyn ResponseBackend>,
        speaker: Arc<dyn Speaker>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            source,
            recognizer,
            backend,
            speaker,
        }
    }

    /// Assemble the pipeline with the default collaborators: the system
    /// microphone, the HTTP recognizer, the Ollama-style backend, and the
    /// HTTP speaker
    ///
    /// # Errors
    ///
    /// Returns error if the microphone is unavailable or an HTTP client
    /// cannot be built
    pub fn with_defaults(config: Config) -> Result<Self> {
        config.validate()?;

        let source = Arc::new(MicSource::new()?);
        let recognizer = Arc::new(HttpRecognizer::new(config.voice.stt_url.clone(), None)?);
        let backend = Arc::new(OllamaBackend::new(&config.backend, config.persona.clone())?);
        let speaker = Arc::new(HttpSpeaker::new(&config.voice)?);

        Ok(Self::new(config, source, recognizer, backend, speaker))
    }

    /// Start the processor task and return the control surface
    #[must_use]
    pub fn spawn(self) -> AssistantHandle {
        let (command_tx, command_rx) = event::command_queue();
        let (state_tx, state_rx) = watch::channel(AssistantState::Idle);
        let notifier = StatusNotifier::new();
        let listening = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));

        let processor = CommandProcessor::new(
            Arc::clone(&self.config),
            command_rx,
            command_tx.clone(),
            notifier.clone(),
            state_tx,
            Arc::clone(&listening),
            Arc::clone(&running),
            self.source,
            self.recognizer,
            self.backend,
            self.speaker,
        );

        let task = tokio::spawn(processor.run());
        tracing::info!(wake_word = %self.config.wake_word, "assistant started");

        AssistantHandle {
            commands: command_tx,
            notifier,
            state: state_rx,
            listening,
            running,
            task,
        }
    }
}

/// Control surface for a running assistant
///
/// All methods are command enqueues or passive observations; effects land
/// when the processor dequeues.
pub struct AssistantHandle {
    commands: CommandSender,
    notifier: StatusNotifier,
    state: watch::Receiver<AssistantState>,
    listening: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl AssistantHandle {
    /// Request a listening session
    pub fn start_listening(&self) {
        let _ = self.commands.send(Event::StartListening);
    }

    /// Request the end of the current listening session
    pub fn stop_listening(&self) {
        let _ = self.commands.send(Event::StopListening);
    }

    /// A producer handle onto the command queue, for front-ends that inject
    /// their own events
    #[must_use]
    pub fn commands(&self) -> CommandSender {
        self.commands.clone()
    }

    /// Subscribe to status notifications
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.notifier.subscribe()
    }

    /// The most recently published state
    #[must_use]
    pub fn state(&self) -> AssistantState {
        *self.state.borrow()
    }

    /// A watch receiver over state transitions
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<AssistantState> {
        self.state.clone()
    }

    /// Stop the pipeline and wait for the processor to exit
    ///
    /// Capture sessions observe the cleared listening flag and wind down on
    /// their own.
    pub async fn shutdown(self) {
        tracing::info!("shutting down");
        self.listening.store(false, Ordering::Release);
        self.running.store(false, Ordering::Release);

        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "processor task ended abnormally");
        }
    }
}
