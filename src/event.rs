//! Pipeline events, the command queue, and the status notifier
//!
//! The command queue is an unbounded, ordered, multi-producer single-consumer
//! channel feeding the command processor. The status notifier is the reverse
//! path: a one-way, fire-and-forget broadcast of state hints to any observer
//! (typically a front-end). Status events carry no ordering guarantee across
//! tasks and are display hints, not a transaction log.

use tokio::sync::{broadcast, mpsc};

/// A command consumed by the command processor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Begin a listening session
    StartListening,

    /// End the current listening session
    StopListening,

    /// The recognizer produced a transcript
    UtteranceRecognized {
        /// Recognized text, unnormalized
        text: String,
    },
}

/// Assistant state as observed by the front-end
///
/// Exactly one authoritative copy exists, owned by the command processor and
/// published through a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssistantState {
    /// Nothing in flight, not listening
    #[default]
    Idle,
    /// A capture session is active
    Listening,
    /// Waiting on the response backend
    Thinking,
    /// Reply dispatched to the speaker
    Responding,
}

/// A best-effort status notification for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// Human-readable status line
    Status(String),

    /// Microphone activity indicator
    Listening(bool),

    /// Thinking indicator
    Thinking(bool),
}

/// Producer half of the command queue
pub type CommandSender = mpsc::UnboundedSender<Event>;

/// Consumer half of the command queue
pub type CommandReceiver = mpsc::UnboundedReceiver<Event>;

/// Create the command queue
///
/// Sends never block and never drop; events arrive in FIFO order with no
/// coalescing. Duplicate events are delivered as-is.
#[must_use]
pub fn command_queue() -> (CommandSender, CommandReceiver) {
    mpsc::unbounded_channel()
}

/// Capacity of the status broadcast channel
///
/// Slow observers lag (skipping oldest events) rather than blocking producers.
const STATUS_CAPACITY: usize = 64;

/// One-way notification channel from the pipeline to observers
///
/// Cloneable; every pipeline task holds its own handle. Sending with no
/// subscribers is a no-op, never an error.
#[derive(Debug, Clone)]
pub struct StatusNotifier {
    tx: broadcast::Sender<StatusEvent>,
}

impl StatusNotifier {
    /// Create a notifier with no subscribers yet
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(STATUS_CAPACITY);
        Self { tx }
    }

    /// Subscribe to status events from this point on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.tx.subscribe()
    }

    /// Emit a human-readable status line
    pub fn status(&self, text: impl Into<String>) {
        self.send(StatusEvent::Status(text.into()));
    }

    /// Emit a listening indicator change
    pub fn listening(&self, on: bool) {
        self.send(StatusEvent::Listening(on));
    }

    /// Emit a thinking indicator change
    pub fn thinking(&self, on: bool) {
        self.send(StatusEvent::Thinking(on));
    }

    fn send(&self, event: StatusEvent) {
        // A send error only means there are no subscribers
        let _ = self.tx.send(event);
    }
}

impl Default for StatusNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_without_subscribers_is_silent() {
        let notifier = StatusNotifier::new();
        notifier.status("Ready");
        notifier.listening(true);
        notifier.thinking(false);
    }

    #[tokio::test]
    async fn subscriber_sees_events_in_order() {
        let notifier = StatusNotifier::new();
        let mut rx = notifier.subscribe();

        notifier.listening(true);
        notifier.status("Listening...");

        assert_eq!(rx.recv().await.unwrap(), StatusEvent::Listening(true));
        assert_eq!(
            rx.recv().await.unwrap(),
            StatusEvent::Status("Listening...".to_string())
        );
    }

    #[tokio::test]
    async fn command_queue_preserves_fifo_order() {
        let (tx, mut rx) = command_queue();

        tx.send(Event::StartListening).unwrap();
        tx.send(Event::UtteranceRecognized {
            text: "one".to_string(),
        })
        .unwrap();
        tx.send(Event::StartListening).unwrap();
        tx.send(Event::StopListening).unwrap();

        assert_eq!(rx.recv().await, Some(Event::StartListening));
        assert_eq!(
            rx.recv().await,
            Some(Event::UtteranceRecognized {
                text: "one".to_string()
            })
        );
        assert_eq!(rx.recv().await, Some(Event::StartListening));
        assert_eq!(rx.recv().await, Some(Event::StopListening));
    }
}
