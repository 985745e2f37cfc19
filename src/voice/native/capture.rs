//! Microphone capture

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig, SupportedStreamConfigRange};

use super::endpoint::{Endpoint, EndpointDetector};
use crate::{Error, Result};

/// Capture sample rate (16 kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Result of one blocking capture
#[derive(Debug)]
pub enum Captured {
    Utterance(Vec<f32>),
    NoSpeech,
    Stopped,
}

/// Mono samples written by the input callback
type SharedSamples = Arc<Mutex<Vec<f32>>>;

/// Microphone on the default input device, downmixed to 16 kHz mono
///
/// Holds a `cpal` stream, so it must stay on the thread that created it.
pub struct AudioCapture {
    device: Device,
    config: StreamConfig,
    samples: SharedSamples,
    stream: Option<Stream>,
}

impl AudioCapture {
    /// Open the default input device
    ///
    /// Mono configurations are preferred; anything with more channels is
    /// averaged down in the callback.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Audio`] if there is no input device or none of its
    /// configurations can run at 16 kHz
    pub fn new() -> Result<Self> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| Error::Audio("no microphone found".to_string()))?;

        let range = device
            .supported_input_configs()
            .map_err(audio_error)?
            .filter(supports_speech_rate)
            .min_by_key(SupportedStreamConfigRange::channels)
            .ok_or_else(|| Error::Audio(format!("microphone cannot record at {SAMPLE_RATE} Hz")))?;
        let config = range.with_sample_rate(SampleRate(SAMPLE_RATE)).config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            channels = config.channels,
            "microphone opened"
        );

        Ok(Self {
            device,
            config,
            samples: SharedSamples::default(),
            stream: None,
        })
    }

    fn open_stream(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let samples = Arc::clone(&self.samples);
        let channels = usize::from(self.config.channels.max(1));
        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut out) = samples.lock() {
                        out.extend(downmix(data, channels));
                    }
                },
                |err| tracing::error!(error = %err, "microphone stream error"),
                None,
            )
            .map_err(audio_error)?;
        stream.play().map_err(audio_error)?;

        self.stream = Some(stream);
        Ok(())
    }

    fn close_stream(&mut self) {
        self.stream = None;
        self.drain();
    }

    fn drain(&self) -> Vec<f32> {
        self.samples
            .lock()
            .map(|mut out| std::mem::take(&mut *out))
            .unwrap_or_default()
    }

    /// Block until one utterance is captured, nothing is said, or `stop` is set
    ///
    /// # Errors
    ///
    /// Returns [`Error::Audio`] if the input stream cannot be started
    pub fn record_utterance(&mut self, stop: &AtomicBool) -> Result<Captured> {
        self.open_stream()?;
        let mut detector = EndpointDetector::new();

        let captured = loop {
            if stop.load(Ordering::SeqCst) {
                break Captured::Stopped;
            }
            std::thread::sleep(POLL_INTERVAL);

            match detector.push(&self.drain()) {
                Endpoint::Pending => {}
                Endpoint::Complete => break Captured::Utterance(detector.take_speech()),
                Endpoint::NoSpeech => break Captured::NoSpeech,
            }
        };

        self.close_stream();
        Ok(captured)
    }
}

fn supports_speech_rate(range: &SupportedStreamConfigRange) -> bool {
    (range.min_sample_rate().0..=range.max_sample_rate().0).contains(&SAMPLE_RATE)
}

fn audio_error(e: impl std::fmt::Display) -> Error {
    Error::Audio(e.to_string())
}

/// Average interleaved frames into mono
#[allow(clippy::cast_precision_loss)]
fn downmix(data: &[f32], channels: usize) -> impl Iterator<Item = f32> + '_ {
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
}

/// Whether a default input device exists
#[must_use]
pub fn input_device_available() -> bool {
    cpal::default_host().default_input_device().is_some()
}

/// Encode mono samples as a 16-bit PCM WAV file
///
/// # Errors
///
/// Returns [`Error::Audio`] if encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut wav = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    let mut writer = hound::WavWriter::new(&mut wav, spec).map_err(audio_error)?;
    for sample in samples.iter().copied().map(to_pcm16) {
        writer.write_sample(sample).map_err(audio_error)?;
    }
    writer.finalize().map_err(audio_error)?;

    Ok(wav.into_inner())
}

#[allow(clippy::cast_possible_truncation)]
fn to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_header_and_length() {
        let wav = samples_to_wav(&[0.0, 0.5, -0.5, 1.0], SAMPLE_RATE).unwrap();
        assert_eq!(&wav[..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(wav.len(), 44 + 4 * 2);
    }

    #[test]
    fn stereo_frames_are_averaged() {
        let mono: Vec<f32> = downmix(&[1.0, 0.0, -0.5, -0.5, 0.25], 2).collect();
        assert_eq!(mono, [0.5, -0.5, 0.25]);
    }

    #[test]
    fn pcm_conversion_clamps() {
        assert_eq!(to_pcm16(2.0), i16::MAX);
        assert_eq!(to_pcm16(-2.0), -i16::MAX);
        assert_eq!(to_pcm16(0.0), 0);
    }
}
