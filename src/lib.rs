//! Vesper - Voice-driven assistant pipeline
//!
//! This library provides the core pipeline for a wake-word-gated voice
//! assistant:
//! - Audio capture with energy-based speech boundaries
//! - Speech recognition and synthesis over HTTP adapters
//! - A FIFO command queue with a single-consumer processor
//! - An Ollama-style response backend
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   Front-ends                         │
//! │        CLI  │  desktop shells  │  tests             │
//! └────────────────────┬────────────────────────────────┘
//!                      │ commands / status
//! ┌────────────────────▼────────────────────────────────┐
//! │               Command Processor                      │
//! │   wake gate  │  state machine  │  reply dispatch    │
//! └──────┬─────────────────┬───────────────────┬────────┘
//!        │                 │                   │
//! ┌──────▼──────┐  ┌───────▼────────┐  ┌───────▼────────┐
//! │ Capture/STT │  │ Ollama backend │  │  TTS/Speaker   │
//! └─────────────┘  └────────────────┘  └────────────────┘
//! ```

pub mod assistant;
pub mod backend;
pub mod config;
pub mod error;
pub mod event;
mod listener;
pub mod processor;
pub mod voice;

pub use assistant::{Assistant, AssistantHandle};
pub use backend::{OllamaBackend, ResponseBackend};
pub use config::Config;
pub use error::{Error, Result};
pub use event::{AssistantState, Event, StatusEvent, StatusNotifier};
