//! Kyra - personal assistant core
//!
//! This library provides the pieces behind the Kyra dashboard:
//! - Voice orb (listen, transcribe, reply, speak) with a queued speech output
//! - Persistent chat sessions with export and import
//! - Assistant replies from a hosted generative model
//! - Dashboard widgets (weather, notes, reminders, calendar, system, ...)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Interfaces                        │
//! │        CLI chat  │  Voice orb  │  Widgets           │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Kyra core                           │
//! │   ChatService  │  VoiceSession/Orb  │  SpeechQueue  │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                    Ports                             │
//! │   Generator  │  Speech in/out  │  Storage  │  Notify │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod assistant;
pub mod chat;
pub mod config;
pub mod error;
pub mod notify;
pub mod voice;
pub mod weather;
pub mod widgets;

pub use assistant::{GeminiClient, PromptBuilder, ResponseGenerator};
pub use chat::{ChatService, ChatSession, ChatStore, Message, Role};
pub use config::Config;
pub use error::{Error, Result};
pub use notify::{Notice, Notifier};
pub use voice::{Orb, OrbState, VoiceHandle, VoiceSession, VoiceSettings};
pub use weather::{WeatherClient, WeatherReport};
