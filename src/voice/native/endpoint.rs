//! Utterance endpointing
//!
//! Energy-based detection of where a spoken utterance starts and ends in the
//! microphone stream, so capture can stop on its own like a one-shot
//! recognizer does.

use super::capture::SAMPLE_RATE;

/// Minimum RMS energy considered speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum speech before an utterance counts (0.3 s at 16 kHz)
const MIN_SPEECH_SAMPLES: usize = 4800;

/// Trailing silence that ends an utterance (0.8 s)
const SILENCE_SAMPLES: usize = 12_800;

/// Give up when nothing is said for this long (6 s)
const NO_SPEECH_SAMPLES: usize = SAMPLE_RATE as usize * 6;

/// Hard cap on one utterance (30 s)
const MAX_UTTERANCE_SAMPLES: usize = SAMPLE_RATE as usize * 30;

/// Endpointing progress after a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Keep capturing
    Pending,
    /// Speech followed by silence; utterance ready
    Complete,
    /// Timed out without speech
    NoSpeech,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Waiting,
    Speaking,
}

/// Tracks speech activity across captured chunks
#[derive(Debug)]
pub struct EndpointDetector {
    phase: Phase,
    speech: Vec<f32>,
    waited: usize,
    silence: usize,
}

impl Default for EndpointDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointDetector {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: Phase::Waiting,
            speech: Vec::new(),
            waited: 0,
            silence: 0,
        }
    }

    /// Feed captured samples
    pub fn push(&mut self, samples: &[f32]) -> Endpoint {
        if samples.is_empty() {
            return Endpoint::Pending;
        }
        let is_speech = calculate_energy(samples) > ENERGY_THRESHOLD;

        match self.phase {
            Phase::Waiting => {
                if is_speech {
                    self.phase = Phase::Speaking;
                    self.speech.extend_from_slice(samples);
                    self.silence = 0;
                    tracing::trace!("speech started");
                } else {
                    self.waited += samples.len();
                    if self.waited > NO_SPEECH_SAMPLES {
                        return Endpoint::NoSpeech;
                    }
                }
            }
            Phase::Speaking => {
                self.speech.extend_from_slice(samples);
                if is_speech {
                    self.silence = 0;
                } else {
                    self.silence += samples.len();
                }

                if self.silence > SILENCE_SAMPLES {
                    if self.speech.len() > MIN_SPEECH_SAMPLES + self.silence {
                        tracing::debug!(samples = self.speech.len(), "utterance complete");
                        return Endpoint::Complete;
                    }
                    // A click or cough; keep waiting
                    self.phase = Phase::Waiting;
                    self.waited += self.speech.len();
                    self.speech.clear();
                    self.silence = 0;
                }

                if self.speech.len() > MAX_UTTERANCE_SAMPLES {
                    return Endpoint::Complete;
                }
            }
        }
        Endpoint::Pending
    }

    /// Take the captured utterance
    pub fn take_speech(&mut self) -> Vec<f32> {
        self.phase = Phase::Waiting;
        self.waited = 0;
        self.silence = 0;
        std::mem::take(&mut self.speech)
    }
}

/// RMS energy of a chunk
#[allow(clippy::cast_precision_loss)]
fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
