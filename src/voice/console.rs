//! Terminal speech backends
//!
//! Typed lines stand in for recognized speech and printed lines for spoken
//! output, so the orb can be driven without audio hardware.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify, mpsc};

use super::ports::{
    RecognitionError, RecognitionOptions, SpeechInput, SpeechOutput, SynthesisError, Transcript,
    Utterance,
};

/// How long a console capture waits for a typed line
pub const DEFAULT_LISTEN_TIMEOUT: Duration = Duration::from_secs(30);

/// Words per minute at rate 1.0 when pacing output
const WORDS_PER_MINUTE: f32 = 150.0;

/// Recognizer fed with lines from a channel
pub struct ConsoleSpeechInput {
    lines: Mutex<mpsc::Receiver<String>>,
    stop: Notify,
    timeout: Duration,
}

impl ConsoleSpeechInput {
    /// Create the recognizer and the sender the terminal loop writes lines to
    #[must_use]
    pub fn channel(timeout: Duration) -> (mpsc::Sender<String>, Self) {
        let (tx, rx) = mpsc::channel(8);
        let input = Self {
            lines: Mutex::new(rx),
            stop: Notify::new(),
            timeout,
        };
        (tx, input)
    }
}

#[async_trait]
impl SpeechInput for ConsoleSpeechInput {
    async fn recognize(
        &self,
        options: &RecognitionOptions,
    ) -> Result<Option<Transcript>, RecognitionError> {
        let mut lines = self.lines.lock().await;
        println!("[listening, {}] say something:", options.language);

        tokio::select! {
            line = lines.recv() => match line {
                Some(line) => {
                    let line = line.trim();
                    Ok((!line.is_empty()).then(|| Transcript::new(line)))
                }
                None => Err(RecognitionError::AudioCapture),
            },
            () = self.stop.notified() => Ok(None),
            () = tokio::time::sleep(self.timeout) => Err(RecognitionError::NoSpeech),
        }
    }

    fn stop(&self) {
        self.stop.notify_waiters();
    }
}

/// Synthesizer that prints utterances
pub struct ConsoleSpeechOutput {
    speaker: String,
    paced: bool,
    cancel: Notify,
}

impl ConsoleSpeechOutput {
    /// `paced` holds each utterance for roughly its spoken duration
    #[must_use]
    pub fn new(speaker: impl Into<String>, paced: bool) -> Self {
        Self {
            speaker: speaker.into(),
            paced,
            cancel: Notify::new(),
        }
    }
}

#[async_trait]
impl SpeechOutput for ConsoleSpeechOutput {
    async fn speak(&self, utterance: &Utterance) -> Result<(), SynthesisError> {
        println!("{} (speaking): {}", self.speaker, utterance.text);
        if !self.paced {
            return Ok(());
        }

        tokio::select! {
            () = tokio::time::sleep(speaking_time(&utterance.text, utterance.rate)) => Ok(()),
            () = self.cancel.notified() => Err(SynthesisError("interrupted".to_string())),
        }
    }

    fn cancel(&self) {
        self.cancel.notify_waiters();
    }
}

/// Approximate time to say `text` at `rate`
#[allow(clippy::cast_precision_loss)]
fn speaking_time(text: &str, rate: f32) -> Duration {
    let words = text.split_whitespace().count() as f32;
    let rate = rate.max(0.1);
    Duration::from_secs_f32(words * 60.0 / (WORDS_PER_MINUTE * rate))
}
