//! Voice session state machine
//!
//! [`Orb`] is a pure transition function: it consumes [`OrbEvent`]s and
//! returns the [`OrbCommand`]s the driver must execute. It performs no I/O and
//! never sleeps; delays travel inside commands.
//!
//! ```text
//!   idle ──toggle──▶ listening ──transcript──▶ processing ──reply──▶ speaking
//!    ▲                   │                          │                    │
//!    └──── stop / error / no result ◀───────────────┴──── queue drained ─┘
//! ```

use std::time::Duration;

use super::ports::{RecognitionError, RecognitionOptions, SynthesisError, Transcript, Utterance};
use super::queue::{Dispatch, Finished, SpeechQueue, UtteranceId};
use super::settings::VoiceSettings;
use super::wake_word::WakeWordMatcher;
use crate::assistant::{APOLOGY_TEXT, MISSING_KEY_TEXT, OVERLOADED_TEXT, ReplyFailure};
use crate::chat::Message;
use crate::notify::Notice;

/// Identifies one recognition capture
pub type RecognitionId = u64;

/// Identifies one user turn (transcript → reply)
pub type TurnId = u64;

/// Spoken acknowledgement for a bare wake word
pub const WAKE_ACK_TEXT: &str = "Yes?";

/// Observable orb state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrbState {
    #[default]
    Idle,
    Listening,
    Processing,
    Speaking,
}

impl OrbState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Processing => "processing",
            Self::Speaking => "speaking",
        }
    }
}

impl std::fmt::Display for OrbState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Microphone permission as last observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Permission {
    #[default]
    Unknown,
    Granted,
    Denied,
}

/// Fixed delays applied by the orb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrbTimings {
    /// Before starting an utterance from idle
    pub settle: Duration,
    /// Before the next queued utterance after a normal end
    pub next_after_end: Duration,
    /// Before the next queued utterance after an engine error
    pub next_after_error: Duration,
    /// Before the overload retry
    pub retry: Duration,
    /// Before restarting capture in continuous mode
    pub restart: Duration,
}

impl Default for OrbTimings {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(300),
            next_after_end: Duration::from_millis(200),
            next_after_error: Duration::from_millis(300),
            retry: crate::assistant::OVERLOAD_RETRY_DELAY,
            restart: Duration::from_millis(100),
        }
    }
}

impl OrbTimings {
    /// No delays at all
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            settle: Duration::ZERO,
            next_after_end: Duration::ZERO,
            next_after_error: Duration::ZERO,
            retry: Duration::ZERO,
            restart: Duration::ZERO,
        }
    }
}

/// Inputs to the orb
#[derive(Debug, Clone, PartialEq)]
pub enum OrbEvent {
    /// The orb button: stop speaking, request permission, stop or start listening
    Toggle,
    StopListening,
    /// Cancel playback, drop the queue and any pending retry
    StopSpeaking,
    /// Drop pending utterances only
    ClearQueue,
    /// Speak text through the queue
    Speak(String),
    UpdateSettings(VoiceSettings),
    PermissionResolved { granted: bool },
    RecognitionFinished {
        id: RecognitionId,
        result: Result<Option<Transcript>, RecognitionError>,
    },
    ReplyReceived {
        turn: TurnId,
        attempt: u8,
        result: Result<String, ReplyFailure>,
    },
    RetryElapsed { turn: TurnId },
    UtteranceFinished {
        id: UtteranceId,
        result: Result<(), SynthesisError>,
    },
}

/// Side effects requested by the orb
#[derive(Debug, Clone, PartialEq)]
pub enum OrbCommand {
    RequestPermission,
    StartRecognition {
        id: RecognitionId,
        options: RecognitionOptions,
        delay: Duration,
    },
    StopRecognition,
    /// Ask the assistant for a reply; attempt 0 also records the user turn
    Generate {
        turn: TurnId,
        utterance: String,
        attempt: u8,
    },
    ScheduleRetry { turn: TurnId, delay: Duration },
    CancelRetry,
    StartUtterance {
        id: UtteranceId,
        utterance: Utterance,
        delay: Duration,
    },
    CancelSpeech,
    Notify(Notice),
    RecordTurn(Message),
}

#[derive(Debug)]
struct Turn {
    id: TurnId,
    utterance: String,
    retry_pending: bool,
}

/// Voice session orchestrator
#[derive(Debug)]
pub struct Orb {
    settings: VoiceSettings,
    matcher: WakeWordMatcher,
    timings: OrbTimings,
    permission: Permission,
    permission_pending: bool,
    recognizer_available: bool,
    listening: Option<RecognitionId>,
    turn: Option<Turn>,
    queue: SpeechQueue,
    /// Continuous listening was started and not explicitly stopped
    armed: bool,
    next_recognition: RecognitionId,
    next_turn: TurnId,
}

impl Orb {
    #[must_use]
    pub fn new(settings: VoiceSettings, timings: OrbTimings) -> Self {
        let settings = settings.clamped();
        Self {
            matcher: WakeWordMatcher::new(&settings.wake_words),
            settings,
            timings,
            permission: Permission::Unknown,
            permission_pending: false,
            recognizer_available: true,
            listening: None,
            turn: None,
            queue: SpeechQueue::new(),
            armed: false,
            next_recognition: 0,
            next_turn: 0,
        }
    }

    /// Start with a known permission state
    #[must_use]
    pub const fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = permission;
        self
    }

    /// Mark whether a recognizer exists
    #[must_use]
    pub const fn with_recognizer(mut self, available: bool) -> Self {
        self.recognizer_available = available;
        self
    }

    /// Current state; speaking wins over processing, processing over listening
    #[must_use]
    pub const fn state(&self) -> OrbState {
        if self.queue.is_speaking() {
            OrbState::Speaking
        } else if self.turn.is_some() {
            OrbState::Processing
        } else if self.listening.is_some() {
            OrbState::Listening
        } else {
            OrbState::Idle
        }
    }

    /// Pending (not yet started) utterances
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub const fn permission(&self) -> Permission {
        self.permission
    }

    #[must_use]
    pub const fn settings(&self) -> &VoiceSettings {
        &self.settings
    }

    /// Whether continuous listening will restart capture when idle
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.armed
    }

    /// Apply one event
    pub fn handle(&mut self, event: OrbEvent) -> Vec<OrbCommand> {
        let before = self.state();
        let mut commands = Vec::new();

        match event {
            OrbEvent::Toggle => self.toggle(&mut commands),
            OrbEvent::StopListening => {
                self.armed = false;
                self.stop_listening(&mut commands);
            }
            OrbEvent::StopSpeaking => self.stop_speaking(&mut commands),
            OrbEvent::ClearQueue => {
                self.queue.clear_queue();
            }
            OrbEvent::Speak(text) => self.speak(text, &mut commands),
            OrbEvent::UpdateSettings(settings) => self.update_settings(settings),
            OrbEvent::PermissionResolved { granted } => {
                self.permission_resolved(granted, &mut commands);
            }
            OrbEvent::RecognitionFinished { id, result } => {
                self.recognition_finished(id, result, &mut commands);
            }
            OrbEvent::ReplyReceived {
                turn,
                attempt,
                result,
            } => self.reply_received(turn, attempt, result, &mut commands),
            OrbEvent::RetryElapsed { turn } => self.retry_elapsed(turn, &mut commands),
            OrbEvent::UtteranceFinished { id, result } => {
                self.utterance_finished(id, &result, &mut commands);
            }
        }

        self.rearm(&mut commands);

        let after = self.state();
        if before != after {
            tracing::debug!(from = %before, to = %after, "orb state changed");
        }
        commands
    }

    fn toggle(&mut self, commands: &mut Vec<OrbCommand>) {
        if self.queue.is_speaking() {
            self.stop_speaking(commands);
        } else if self.permission != Permission::Granted {
            if !self.permission_pending {
                self.permission_pending = true;
                commands.push(OrbCommand::RequestPermission);
            }
        } else if !self.recognizer_available {
            commands.push(OrbCommand::Notify(Notice::destructive(
                "Speech Recognition Unavailable",
                "No speech recognizer is available on this system.",
            )));
        } else if self.listening.is_some() {
            self.armed = false;
            self.stop_listening(commands);
        } else if self.turn.is_none() {
            self.armed = self.settings.continuous_listening;
            self.start_listening(Duration::ZERO, commands);
        }
    }

    fn start_listening(&mut self, delay: Duration, commands: &mut Vec<OrbCommand>) {
        self.next_recognition += 1;
        self.listening = Some(self.next_recognition);
        commands.push(OrbCommand::StartRecognition {
            id: self.next_recognition,
            options: RecognitionOptions::from_settings(&self.settings),
            delay,
        });
    }

    fn stop_listening(&mut self, commands: &mut Vec<OrbCommand>) {
        if self.listening.take().is_some() {
            commands.push(OrbCommand::StopRecognition);
        }
    }

    fn stop_speaking(&mut self, commands: &mut Vec<OrbCommand>) {
        self.armed = false;
        if self.queue.stop() {
            commands.push(OrbCommand::CancelSpeech);
        }
        if self.turn.as_ref().is_some_and(|t| t.retry_pending) {
            self.turn = None;
            commands.push(OrbCommand::CancelRetry);
        }
    }

    fn speak(&mut self, text: impl Into<String>, commands: &mut Vec<OrbCommand>) {
        let text = text.into();
        if text.trim().is_empty() {
            return;
        }

        if let Dispatch::Start { id, text } = self.queue.enqueue_or_speak(text) {
            self.stop_listening(commands);
            commands.push(OrbCommand::StartUtterance {
                id,
                utterance: Utterance::new(text, &self.settings),
                delay: self.timings.settle,
            });
        }
    }

    fn update_settings(&mut self, settings: VoiceSettings) {
        let settings = settings.clamped();
        self.matcher = WakeWordMatcher::new(&settings.wake_words);
        if !settings.continuous_listening {
            self.armed = false;
        }
        self.settings = settings;
    }

    fn permission_resolved(&mut self, granted: bool, commands: &mut Vec<OrbCommand>) {
        self.permission_pending = false;
        if granted {
            self.permission = Permission::Granted;
            commands.push(OrbCommand::Notify(Notice::info(
                "Microphone Access Granted",
                "You can now use voice commands.",
            )));
        } else {
            self.permission = Permission::Denied;
            commands.push(OrbCommand::Notify(Notice::destructive(
                "Microphone Access Required",
                "Please allow microphone access to use voice features.",
            )));
        }
    }

    fn recognition_finished(
        &mut self,
        id: RecognitionId,
        result: Result<Option<Transcript>, RecognitionError>,
        commands: &mut Vec<OrbCommand>,
    ) {
        if self.listening != Some(id) {
            tracing::trace!(id, "ignoring stale recognition result");
            return;
        }
        self.listening = None;

        match result {
            Ok(Some(transcript)) => self.transcript(transcript, commands),
            Ok(None) => tracing::debug!("recognition ended without a result"),
            Err(RecognitionError::NotAllowed) => {
                self.permission = Permission::Denied;
                self.armed = false;
                commands.push(OrbCommand::Notify(Notice::destructive(
                    "Microphone Access Denied",
                    "Please allow microphone access to use voice features.",
                )));
            }
            Err(RecognitionError::NoSpeech | RecognitionError::Aborted) => {
                tracing::debug!("recognition ended without speech");
            }
            Err(e) => {
                tracing::warn!(error = %e, "speech recognition error");
                self.armed = false;
                commands.push(OrbCommand::Notify(Notice::destructive(
                    "Speech Recognition Error",
                    format!("Speech recognition error: {}", e.as_str()),
                )));
            }
        }
    }

    fn transcript(&mut self, transcript: Transcript, commands: &mut Vec<OrbCommand>) {
        let threshold = self.settings.confidence_threshold;
        if transcript.confidence.is_some_and(|c| c < threshold) {
            tracing::debug!(
                confidence = ?transcript.confidence,
                threshold,
                "discarding low-confidence transcript"
            );
            return;
        }

        let text = transcript.text.trim();
        if text.is_empty() {
            return;
        }
        tracing::info!(transcript = %text, "voice input");

        let wake = if self.armed { self.matcher.detect(text) } else { None };
        match wake.map(|w| w.command) {
            Some(Some(command)) => self.begin_turn(command, commands),
            Some(None) => self.speak(WAKE_ACK_TEXT, commands),
            None => self.begin_turn(text.to_string(), commands),
        }
    }

    fn begin_turn(&mut self, utterance: String, commands: &mut Vec<OrbCommand>) {
        self.next_turn += 1;
        commands.push(OrbCommand::Generate {
            turn: self.next_turn,
            utterance: utterance.clone(),
            attempt: 0,
        });
        self.turn = Some(Turn {
            id: self.next_turn,
            utterance,
            retry_pending: false,
        });
    }

    fn reply_received(
        &mut self,
        turn: TurnId,
        attempt: u8,
        result: Result<String, ReplyFailure>,
        commands: &mut Vec<OrbCommand>,
    ) {
        if self.turn.as_ref().is_none_or(|t| t.id != turn || t.retry_pending) {
            tracing::trace!(turn, "ignoring stale reply");
            return;
        }

        match result {
            Ok(text) => {
                self.turn = None;
                commands.push(OrbCommand::RecordTurn(Message::assistant(text.clone(), true)));
                self.speak(text, commands);
            }
            Err(ReplyFailure::MissingCredentials) => {
                self.turn = None;
                self.speak(MISSING_KEY_TEXT, commands);
            }
            Err(ReplyFailure::Overloaded) if attempt == 0 => {
                if let Some(t) = self.turn.as_mut() {
                    t.retry_pending = true;
                }
                self.speak(APOLOGY_TEXT, commands);
                commands.push(OrbCommand::ScheduleRetry {
                    turn,
                    delay: self.timings.retry,
                });
            }
            Err(_) => {
                self.turn = None;
                let text = if attempt == 0 { APOLOGY_TEXT } else { OVERLOADED_TEXT };
                self.speak(text, commands);
                commands.push(OrbCommand::Notify(Notice::destructive(
                    "Processing Error",
                    "Failed to process your voice input.",
                )));
            }
        }
    }

    fn retry_elapsed(&mut self, turn: TurnId, commands: &mut Vec<OrbCommand>) {
        let Some(current) = self.turn.as_mut() else {
            return;
        };
        if current.id != turn || !current.retry_pending {
            return;
        }
        current.retry_pending = false;
        commands.push(OrbCommand::Generate {
            turn,
            utterance: current.utterance.clone(),
            attempt: 1,
        });
    }

    fn utterance_finished(
        &mut self,
        id: UtteranceId,
        result: &Result<(), SynthesisError>,
        commands: &mut Vec<OrbCommand>,
    ) {
        if let Finished::Next { id, text } = self.queue.finish(id) {
            let delay = if result.is_err() {
                self.timings.next_after_error
            } else {
                self.timings.next_after_end
            };
            commands.push(OrbCommand::StartUtterance {
                id,
                utterance: Utterance::new(text, &self.settings),
                delay,
            });
        }
    }

    /// Restart capture in continuous mode once the interaction is over
    fn rearm(&mut self, commands: &mut Vec<OrbCommand>) {
        if self.armed
            && self.settings.continuous_listening
            && self.permission == Permission::Granted
            && self.state() == OrbState::Idle
        {
            self.start_listening(self.timings.restart, commands);
        }
    }
}
