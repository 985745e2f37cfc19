//! Voice session driver
//!
//! Runs an [`Orb`] on a single task. Control messages and port completions are
//! fed to the orb as events; the commands it returns are executed against the
//! ports, with slow work (recognition, generation, playback, timers) spawned so
//! the loop never blocks. Completions carry the id they were issued with, and
//! the orb drops any that no longer match.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::orb::{Orb, OrbCommand, OrbEvent, OrbState, TurnId};
use super::ports::{MicrophonePermission, SpeechInput, SpeechOutput};
use super::settings::VoiceSettings;
use crate::assistant::{PromptBuilder, ReplyFailure, ResponseGenerator};
use crate::chat::{ConversationLog, Message};
use crate::notify::Notifier;
use crate::{Error, Result};

const CONTROL_CAPACITY: usize = 32;

/// Requests accepted by a running session
#[derive(Debug, Clone, PartialEq)]
pub enum OrbControl {
    Toggle,
    StopListening,
    StopSpeaking,
    ClearQueue,
    Speak(String),
    UpdateSettings(VoiceSettings),
    Shutdown,
}

/// Published session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrbStatus {
    pub state: OrbState,
    /// Utterances waiting behind the active one
    pub queued: usize,
}

/// Capabilities the session drives
#[derive(Clone)]
pub struct VoicePorts {
    pub input: Arc<dyn SpeechInput>,
    pub output: Arc<dyn SpeechOutput>,
    pub permission: Arc<dyn MicrophonePermission>,
    pub notifier: Arc<dyn Notifier>,
    pub generator: Arc<dyn ResponseGenerator>,
    pub log: Arc<dyn ConversationLog>,
}

/// Cloneable handle to a running session
#[derive(Debug, Clone)]
pub struct VoiceHandle {
    control: mpsc::Sender<OrbControl>,
    status: watch::Receiver<OrbStatus>,
}

impl VoiceHandle {
    /// Send a control message
    ///
    /// # Errors
    ///
    /// Returns [`Error::Voice`] if the session has stopped
    pub async fn send(&self, control: OrbControl) -> Result<()> {
        self.control
            .send(control)
            .await
            .map_err(|_| Error::Voice("voice session closed".to_string()))
    }

    /// Press the orb
    ///
    /// # Errors
    ///
    /// Returns [`Error::Voice`] if the session has stopped
    pub async fn toggle(&self) -> Result<()> {
        self.send(OrbControl::Toggle).await
    }

    /// Speak text through the queue
    ///
    /// # Errors
    ///
    /// Returns [`Error::Voice`] if the session has stopped
    pub async fn speak(&self, text: impl Into<String>) -> Result<()> {
        self.send(OrbControl::Speak(text.into())).await
    }

    /// # Errors
    ///
    /// Returns [`Error::Voice`] if the session has stopped
    pub async fn stop_listening(&self) -> Result<()> {
        self.send(OrbControl::StopListening).await
    }

    /// # Errors
    ///
    /// Returns [`Error::Voice`] if the session has stopped
    pub async fn stop_speaking(&self) -> Result<()> {
        self.send(OrbControl::StopSpeaking).await
    }

    /// # Errors
    ///
    /// Returns [`Error::Voice`] if the session has stopped
    pub async fn clear_queue(&self) -> Result<()> {
        self.send(OrbControl::ClearQueue).await
    }

    /// # Errors
    ///
    /// Returns [`Error::Voice`] if the session has stopped
    pub async fn update_settings(&self, settings: VoiceSettings) -> Result<()> {
        self.send(OrbControl::UpdateSettings(settings)).await
    }

    /// Stop the session, cancelling capture and playback
    ///
    /// # Errors
    ///
    /// Returns [`Error::Voice`] if the session has already stopped
    pub async fn shutdown(&self) -> Result<()> {
        self.send(OrbControl::Shutdown).await
    }

    /// Latest status
    #[must_use]
    pub fn status(&self) -> OrbStatus {
        *self.status.borrow()
    }

    /// Receiver notified on every status change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<OrbStatus> {
        self.status.clone()
    }
}

enum Internal {
    Orb(OrbEvent),
    Reply {
        turn: TurnId,
        attempt: u8,
        prompt: String,
        result: Result<String>,
    },
}

/// Single-task driver for an [`Orb`]
pub struct VoiceSession {
    orb: Orb,
    ports: VoicePorts,
    prompts: PromptBuilder,
    control: mpsc::Receiver<OrbControl>,
    events_tx: mpsc::UnboundedSender<Internal>,
    events_rx: mpsc::UnboundedReceiver<Internal>,
    status: watch::Sender<OrbStatus>,
    /// Prompt of the latest turn, reused by its retry
    prompt_cache: Option<(TurnId, String)>,
    recognition: Option<JoinHandle<()>>,
    speech: Option<JoinHandle<()>>,
    retry: Option<JoinHandle<()>>,
}

impl VoiceSession {
    /// Start the session on a new task
    #[must_use]
    pub fn spawn(orb: Orb, ports: VoicePorts, prompts: PromptBuilder) -> (VoiceHandle, JoinHandle<()>) {
        let orb = orb.with_recognizer(ports.input.is_available());
        let (control_tx, control_rx) = mpsc::channel(CONTROL_CAPACITY);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(OrbStatus {
            state: orb.state(),
            queued: orb.queued(),
        });

        let session = Self {
            orb,
            ports,
            prompts,
            control: control_rx,
            events_tx,
            events_rx,
            status: status_tx,
            prompt_cache: None,
            recognition: None,
            speech: None,
            retry: None,
        };

        let task = tokio::spawn(session.run());
        let handle = VoiceHandle {
            control: control_tx,
            status: status_rx,
        };
        (handle, task)
    }

    async fn run(mut self) {
        tracing::info!("voice session started");

        loop {
            tokio::select! {
                control = self.control.recv() => {
                    let event = match control {
                        None | Some(OrbControl::Shutdown) => break,
                        Some(OrbControl::Toggle) => OrbEvent::Toggle,
                        Some(OrbControl::StopListening) => OrbEvent::StopListening,
                        Some(OrbControl::StopSpeaking) => OrbEvent::StopSpeaking,
                        Some(OrbControl::ClearQueue) => OrbEvent::ClearQueue,
                        Some(OrbControl::Speak(text)) => OrbEvent::Speak(text),
                        Some(OrbControl::UpdateSettings(s)) => OrbEvent::UpdateSettings(s),
                    };
                    self.dispatch(event);
                }
                Some(internal) = self.events_rx.recv() => {
                    let event = self.internal_event(internal);
                    self.dispatch(event);
                }
            }
        }

        self.shutdown();
        tracing::info!("voice session stopped");
    }

    fn internal_event(&mut self, internal: Internal) -> OrbEvent {
        match internal {
            Internal::Orb(event) => event,
            Internal::Reply {
                turn,
                attempt,
                prompt,
                result,
            } => {
                self.prompt_cache = Some((turn, prompt));
                let result = result.map_err(|e| {
                    tracing::error!(error = %e, turn, attempt, "voice reply failed");
                    ReplyFailure::classify(&e)
                });
                OrbEvent::ReplyReceived {
                    turn,
                    attempt,
                    result,
                }
            }
        }
    }

    fn dispatch(&mut self, event: OrbEvent) {
        for command in self.orb.handle(event) {
            self.execute(command);
        }

        let status = OrbStatus {
            state: self.orb.state(),
            queued: self.orb.queued(),
        };
        self.status.send_if_modified(|current| {
            let changed = *current != status;
            *current = status;
            changed
        });
    }

    fn execute(&mut self, command: OrbCommand) {
        match command {
            OrbCommand::RequestPermission => {
                let permission = Arc::clone(&self.ports.permission);
                let tx = self.events_tx.clone();
                tokio::spawn(async move {
                    let granted = permission.request().await;
                    let _ = tx.send(Internal::Orb(OrbEvent::PermissionResolved { granted }));
                });
            }
            OrbCommand::StartRecognition { id, options, delay } => {
                let input = Arc::clone(&self.ports.input);
                let tx = self.events_tx.clone();
                abort(self.recognition.replace(tokio::spawn(async move {
                    pause(delay).await;
                    let result = input.recognize(&options).await;
                    let _ = tx.send(Internal::Orb(OrbEvent::RecognitionFinished { id, result }));
                })));
            }
            OrbCommand::StopRecognition => {
                abort(self.recognition.take());
                self.ports.input.stop();
            }
            OrbCommand::Generate {
                turn,
                utterance,
                attempt,
            } => self.generate(turn, utterance, attempt),
            OrbCommand::ScheduleRetry { turn, delay } => {
                let tx = self.events_tx.clone();
                abort(self.retry.replace(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(Internal::Orb(OrbEvent::RetryElapsed { turn }));
                })));
            }
            OrbCommand::CancelRetry => abort(self.retry.take()),
            OrbCommand::StartUtterance {
                id,
                utterance,
                delay,
            } => {
                let output = Arc::clone(&self.ports.output);
                let tx = self.events_tx.clone();
                tracing::debug!(id, text = %utterance.text, "starting utterance");
                self.speech = Some(tokio::spawn(async move {
                    pause(delay).await;
                    let result = output.speak(&utterance).await;
                    if let Err(e) = &result {
                        tracing::warn!(error = %e, id, "utterance failed");
                    }
                    let _ = tx.send(Internal::Orb(OrbEvent::UtteranceFinished { id, result }));
                }));
            }
            OrbCommand::CancelSpeech => {
                abort(self.speech.take());
                self.ports.output.cancel();
            }
            OrbCommand::Notify(notice) => self.ports.notifier.notify(notice),
            OrbCommand::RecordTurn(message) => {
                let log = Arc::clone(&self.ports.log);
                tokio::spawn(async move { log.record(message).await });
            }
        }
    }

    /// Build (or reuse) the prompt and ask the generator
    ///
    /// The first attempt snapshots the voice history before recording the
    /// user turn, so the prompt never contains the utterance twice.
    fn generate(&self, turn: TurnId, utterance: String, attempt: u8) {
        let cached = self
            .prompt_cache
            .as_ref()
            .filter(|(t, _)| *t == turn)
            .map(|(_, p)| p.clone());
        let log = Arc::clone(&self.ports.log);
        let generator = Arc::clone(&self.ports.generator);
        let prompts = self.prompts.clone();
        let tx = self.events_tx.clone();

        tokio::spawn(async move {
            let prompt = match cached {
                Some(prompt) => prompt,
                None => {
                    let history = log.history().await;
                    let prompt = prompts.voice(&history, &utterance);
                    if attempt == 0 {
                        log.record(Message::user(utterance, true)).await;
                    }
                    prompt
                }
            };

            let result = generator.generate(&prompt).await;
            let _ = tx.send(Internal::Reply {
                turn,
                attempt,
                prompt,
                result,
            });
        });
    }

    fn shutdown(&mut self) {
        abort(self.recognition.take());
        abort(self.speech.take());
        abort(self.retry.take());
        self.ports.input.stop();
        self.ports.output.cancel();
    }
}

fn abort(task: Option<JoinHandle<()>>) {
    if let Some(task) = task {
        task.abort();
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
