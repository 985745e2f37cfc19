//! Native speech backends
//!
//! Microphone capture with energy endpointing and Whisper transcription for
//! input; `OpenAI` synthesis and speaker playback for output. Audio devices are
//! driven on blocking threads; each capture or utterance gets its own cancel
//! flag so a late stop never leaks into the next one.

mod capture;
mod endpoint;
mod playback;
mod stt;
mod tts;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secrecy::SecretString;

pub use capture::{AudioCapture, Captured, SAMPLE_RATE, input_device_available, samples_to_wav};
pub use endpoint::{Endpoint, EndpointDetector};
pub use playback::{AudioPlayback, Clip, Played};
pub use stt::{DEFAULT_STT_MODEL, SpeechToText};
pub use tts::{DEFAULT_TTS_MODEL, DEFAULT_TTS_VOICE, TextToSpeech};

use super::ports::{
    MicrophonePermission, RecognitionError, RecognitionOptions, SpeechInput, SpeechOutput,
    SynthesisError, Transcript, Utterance,
};
use crate::Result;

/// Cancel flag of the operation currently in flight
#[derive(Debug, Default)]
struct CancelSlot(Mutex<Option<Arc<AtomicBool>>>);

impl CancelSlot {
    fn arm(&self) -> Arc<AtomicBool> {
        let flag = Arc::new(AtomicBool::new(false));
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(Arc::clone(&flag));
        }
        flag
    }

    fn fire(&self) {
        if let Some(flag) = self.0.lock().ok().and_then(|mut slot| slot.take()) {
            flag.store(true, Ordering::SeqCst);
        }
    }
}

/// Microphone + Whisper recognizer
pub struct NativeSpeechInput {
    stt: Arc<SpeechToText>,
    active: CancelSlot,
}

impl NativeSpeechInput {
    /// Create the recognizer from an `OpenAI` key
    ///
    /// # Errors
    ///
    /// Returns error if the key is empty
    pub fn new(openai_key: SecretString) -> Result<Self> {
        Ok(Self {
            stt: Arc::new(SpeechToText::new(openai_key, DEFAULT_STT_MODEL)?),
            active: CancelSlot::default(),
        })
    }
}

#[async_trait]
impl SpeechInput for NativeSpeechInput {
    fn is_available(&self) -> bool {
        input_device_available()
    }

    async fn recognize(
        &self,
        options: &RecognitionOptions,
    ) -> std::result::Result<Option<Transcript>, RecognitionError> {
        let stop = self.active.arm();

        let captured = tokio::task::spawn_blocking(move || {
            AudioCapture::new().and_then(|mut capture| capture.record_utterance(&stop))
        })
        .await
        .map_err(|e| RecognitionError::Other(e.to_string()))?
        .map_err(|e| {
            tracing::warn!(error = %e, "microphone capture failed");
            RecognitionError::AudioCapture
        })?;

        let samples = match captured {
            Captured::Utterance(samples) => samples,
            Captured::NoSpeech => return Err(RecognitionError::NoSpeech),
            Captured::Stopped => return Ok(None),
        };

        let wav = samples_to_wav(&samples, SAMPLE_RATE).map_err(|e| {
            tracing::warn!(error = %e, "failed to encode capture");
            RecognitionError::AudioCapture
        })?;

        let text = self
            .stt
            .transcribe(&wav, &options.language)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "transcription failed");
                RecognitionError::Network
            })?;

        let text = text.trim();
        Ok((!text.is_empty()).then(|| Transcript::new(text)))
    }

    fn stop(&self) {
        self.active.fire();
    }
}

/// `OpenAI` TTS + speaker playback
pub struct NativeSpeechOutput {
    tts: Arc<TextToSpeech>,
    active: CancelSlot,
}

impl NativeSpeechOutput {
    /// Create the synthesizer from an `OpenAI` key
    ///
    /// # Errors
    ///
    /// Returns error if the key is empty
    pub fn new(openai_key: SecretString) -> Result<Self> {
        Ok(Self {
            tts: Arc::new(TextToSpeech::new(openai_key, DEFAULT_TTS_MODEL)?),
            active: CancelSlot::default(),
        })
    }
}

#[async_trait]
impl SpeechOutput for NativeSpeechOutput {
    async fn speak(&self, utterance: &Utterance) -> std::result::Result<(), SynthesisError> {
        let cancel = self.active.arm();

        let audio = self
            .tts
            .synthesize(&utterance.text, utterance.voice.as_deref(), utterance.rate)
            .await
            .map_err(|e| SynthesisError(e.to_string()))?;

        if cancel.load(Ordering::SeqCst) {
            return Err(SynthesisError("interrupted".to_string()));
        }

        let volume = utterance.volume;
        let played = tokio::task::spawn_blocking(move || {
            AudioPlayback::new().and_then(|playback| playback.play_mp3(&audio, volume, &cancel))
        })
        .await
        .map_err(|e| SynthesisError(e.to_string()))?
        .map_err(|e| SynthesisError(e.to_string()))?;

        match played {
            Played::Finished => Ok(()),
            Played::Cancelled => Err(SynthesisError("interrupted".to_string())),
        }
    }

    fn cancel(&self) {
        self.active.fire();
    }
}

/// Grants access when a default input device exists
#[derive(Debug, Default, Clone, Copy)]
pub struct DevicePermission;

#[async_trait]
impl MicrophonePermission for DevicePermission {
    async fn request(&self) -> bool {
        tokio::task::spawn_blocking(input_device_available)
            .await
            .unwrap_or(false)
    }
}
