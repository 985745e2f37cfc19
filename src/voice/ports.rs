//! Speech capability ports
//!
//! The voice session only talks to the microphone, recognizer and synthesizer
//! through these traits. Native backends live in [`super::native`], console
//! backends in [`super::console`]; tests substitute scripted fakes.

use async_trait::async_trait;

use super::settings::VoiceSettings;

/// Recognizer configuration for one capture
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionOptions {
    /// Recognition locale, e.g. `en-US`
    pub language: String,
    /// Continuous-listening mode is active
    pub continuous: bool,
}

impl RecognitionOptions {
    #[must_use]
    pub fn from_settings(settings: &VoiceSettings) -> Self {
        Self {
            language: settings.language.clone(),
            continuous: settings.continuous_listening,
        }
    }
}

/// A final recognition result
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    /// Engine confidence in `0.0..=1.0`, if reported
    pub confidence: Option<f32>,
}

impl Transcript {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
        }
    }

    #[must_use]
    pub const fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Recognizer failure kinds
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecognitionError {
    /// Microphone access refused
    #[error("not-allowed")]
    NotAllowed,
    /// Nothing was said before the recognizer gave up
    #[error("no-speech")]
    NoSpeech,
    /// Capture was stopped before a result
    #[error("aborted")]
    Aborted,
    #[error("audio-capture")]
    AudioCapture,
    #[error("network")]
    Network,
    #[error("{0}")]
    Other(String),
}

impl RecognitionError {
    /// Engine-style error code
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::NotAllowed => "not-allowed",
            Self::NoSpeech => "no-speech",
            Self::Aborted => "aborted",
            Self::AudioCapture => "audio-capture",
            Self::Network => "network",
            Self::Other(kind) => kind,
        }
    }
}

/// Speech-to-text capability
#[async_trait]
pub trait SpeechInput: Send + Sync {
    /// Whether a recognizer exists at all
    fn is_available(&self) -> bool {
        true
    }

    /// Capture a single utterance and return its final transcript
    ///
    /// `Ok(None)` means capture ended without a result.
    async fn recognize(
        &self,
        options: &RecognitionOptions,
    ) -> Result<Option<Transcript>, RecognitionError>;

    /// End the active capture early
    fn stop(&self);
}

/// One unit of synthesized speech
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    /// Preferred voice; `None` for the engine default
    pub voice: Option<String>,
}

impl Utterance {
    /// Build an utterance with the synthesis parameters from `settings`
    #[must_use]
    pub fn new(text: impl Into<String>, settings: &VoiceSettings) -> Self {
        Self {
            text: text.into(),
            rate: settings.tts_rate,
            pitch: settings.tts_pitch,
            volume: settings.tts_volume,
            voice: (!settings.tts_voice.is_empty()).then(|| settings.tts_voice.clone()),
        }
    }
}

/// Synthesis engine failure; treated as completion by the queue
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("synthesis error: {0}")]
pub struct SynthesisError(pub String);

/// Text-to-speech capability
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Speak one utterance, resolving when playback ends, errors or is cancelled
    async fn speak(&self, utterance: &Utterance) -> Result<(), SynthesisError>;

    /// Cancel current playback
    fn cancel(&self);
}

/// Microphone permission prompt
#[async_trait]
pub trait MicrophonePermission: Send + Sync {
    /// Ask for microphone access; returns whether it was granted
    async fn request(&self) -> bool;
}

/// Permission source that always grants access
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysGranted;

#[async_trait]
impl MicrophonePermission for AlwaysGranted {
    async fn request(&self) -> bool {
        true
    }
}
