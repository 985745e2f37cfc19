//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use kyra_assistant::notify::{Notice, Notifier};
use kyra_assistant::voice::{
    MicrophonePermission, OrbStatus, RecognitionError, RecognitionOptions, SpeechInput,
    SpeechOutput, SynthesisError, Transcript, Utterance, VoiceHandle,
};
use kyra_assistant::{Error, ResponseGenerator, Result};

type Recognition = std::result::Result<Option<Transcript>, RecognitionError>;

/// Recognizer that replays scripted results, then listens until stopped
#[derive(Default)]
pub struct ScriptedInput {
    script: Mutex<VecDeque<Recognition>>,
    calls: Mutex<Vec<RecognitionOptions>>,
    stopped: Notify,
    unavailable: bool,
}

impl ScriptedInput {
    pub fn new(script: impl IntoIterator<Item = Recognition>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Self::default()
        })
    }

    /// Recognizer that hears each phrase once, in order
    pub fn hearing(phrases: &[&str]) -> Arc<Self> {
        Self::new(phrases.iter().map(|p| Ok(Some(Transcript::new(*p)))))
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            unavailable: true,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_options(&self) -> Option<RecognitionOptions> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl SpeechInput for ScriptedInput {
    fn is_available(&self) -> bool {
        !self.unavailable
    }

    async fn recognize(&self, options: &RecognitionOptions) -> Recognition {
        self.calls.lock().unwrap().push(options.clone());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => {
                self.stopped.notified().await;
                Ok(None)
            }
        }
    }

    fn stop(&self) {
        self.stopped.notify_waiters();
    }
}

/// Speech output that records every utterance
///
/// A gated output holds each utterance until [`RecordingOutput::release`].
#[derive(Default)]
pub struct RecordingOutput {
    spoken: Mutex<Vec<Utterance>>,
    gated: bool,
    release: Notify,
    cancelled: Notify,
}

impl RecordingOutput {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            gated: true,
            ..Self::default()
        })
    }

    /// Let the current utterance finish
    pub fn release(&self) {
        self.release.notify_one();
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap()
            .iter()
            .map(|u| u.text.clone())
            .collect()
    }

    pub fn utterances(&self) -> Vec<Utterance> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechOutput for RecordingOutput {
    async fn speak(&self, utterance: &Utterance) -> std::result::Result<(), SynthesisError> {
        self.spoken.lock().unwrap().push(utterance.clone());
        if !self.gated {
            return Ok(());
        }
        tokio::select! {
            () = self.release.notified() => Ok(()),
            () = self.cancelled.notified() => Err(SynthesisError("interrupted".to_string())),
        }
    }

    fn cancel(&self) {
        self.cancelled.notify_waiters();
    }
}

/// Permission prompt with a fixed answer
pub struct FixedPermission(pub bool);

#[async_trait]
impl MicrophonePermission for FixedPermission {
    async fn request(&self) -> bool {
        self.0
    }
}

/// Generator that replays scripted replies and records prompts
///
/// Once the script runs out every call answers `"ok"`.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(replies: impl IntoIterator<Item = Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(text: &str) -> Arc<Self> {
        Self::new([Ok(text.to_string())])
    }

    pub fn overloaded() -> Error {
        Error::Overloaded("Gemini API error 503: The model is overloaded.".to_string())
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResponseGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok("ok".to_string()))
    }
}

/// Notifier that keeps every notice
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn titles(&self) -> Vec<String> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.title.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

const WAIT: Duration = Duration::from_secs(5);

/// Poll until `check` holds
pub async fn eventually(what: &str, check: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !check() {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Wait until the published status matches
pub async fn wait_for_status(handle: &VoiceHandle, check: impl FnMut(&OrbStatus) -> bool) {
    let mut status = handle.subscribe();
    tokio::time::timeout(WAIT, status.wait_for(check))
        .await
        .expect("timed out waiting for orb status")
        .expect("voice session closed");
}
