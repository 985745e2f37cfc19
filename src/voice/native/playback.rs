//! Speaker playback

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig, SupportedStreamConfigRange};

use crate::{Error, Result};

/// Rate assumed when a clip carries no frames (synthesized MP3 is 24 kHz)
const DEFAULT_SAMPLE_RATE: u32 = 24000;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Slack past the clip length before playback is considered stuck
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// How playback ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Played {
    Finished,
    Cancelled,
}

/// Decoded mono audio
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Clip {
    /// Decode MP3 bytes, averaging stereo frames to mono
    ///
    /// # Errors
    ///
    /// Returns [`Error::Audio`] on a corrupt stream
    pub fn from_mp3(data: &[u8]) -> Result<Self> {
        let mut decoder = minimp3::Decoder::new(Cursor::new(data));
        let mut clip = Self {
            samples: Vec::new(),
            sample_rate: DEFAULT_SAMPLE_RATE,
        };

        loop {
            let frame = match decoder.next_frame() {
                Ok(frame) => frame,
                Err(minimp3::Error::Eof) => break,
                Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
            };
            if let Ok(rate) = u32::try_from(frame.sample_rate) {
                clip.sample_rate = rate;
            }
            let channels = frame.channels.max(1);
            clip.samples.extend(frame.data.chunks(channels).map(|pcm| {
                pcm.iter().map(|&s| f32::from(s)).sum::<f32>() / (f32::from(i16::MAX) * pcm_len(pcm))
            }));
        }

        Ok(clip)
    }

    /// Playing time at the clip's own rate
    #[must_use]
    pub fn duration(&self) -> Duration {
        let millis = self.samples.len() as u64 * 1000 / u64::from(self.sample_rate.max(1));
        Duration::from_millis(millis)
    }
}

#[allow(clippy::cast_precision_loss)]
fn pcm_len(frame: &[i16]) -> f32 {
    frame.len() as f32
}

/// Blocking player on the default output device
///
/// Run it on a blocking thread.
pub struct AudioPlayback {
    device: Device,
}

impl AudioPlayback {
    /// Open the default output device
    ///
    /// # Errors
    ///
    /// Returns [`Error::Audio`] if there is no output device
    pub fn new() -> Result<Self> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| Error::Audio("no speaker found".to_string()))?;
        Ok(Self { device })
    }

    /// Fewest-channel output configuration running at `sample_rate`
    fn config_for(&self, sample_rate: u32) -> Result<StreamConfig> {
        let range = self
            .device
            .supported_output_configs()
            .map_err(audio_error)?
            .filter(|r| (r.min_sample_rate().0..=r.max_sample_rate().0).contains(&sample_rate))
            .min_by_key(SupportedStreamConfigRange::channels)
            .ok_or_else(|| Error::Audio(format!("speaker cannot play at {sample_rate} Hz")))?;
        Ok(range.with_sample_rate(SampleRate(sample_rate)).config())
    }

    /// Decode MP3 and play it until done or `cancel` is set
    ///
    /// # Errors
    ///
    /// Returns [`Error::Audio`] if decoding or the output stream fails
    pub fn play_mp3(&self, data: &[u8], volume: f32, cancel: &AtomicBool) -> Result<Played> {
        self.play(&Clip::from_mp3(data)?, volume, cancel)
    }

    /// Play a clip at `volume` (clamped to `0.0..=1.0`) until done or `cancel` is set
    ///
    /// # Errors
    ///
    /// Returns [`Error::Audio`] if the output stream cannot be built
    pub fn play(&self, clip: &Clip, volume: f32, cancel: &AtomicBool) -> Result<Played> {
        if clip.samples.is_empty() {
            return Ok(Played::Finished);
        }

        let config = self.config_for(clip.sample_rate)?;
        let channels = usize::from(config.channels.max(1));
        let gain = volume.clamp(0.0, 1.0);
        let samples: Arc<[f32]> = clip.samples.iter().map(|s| s * gain).collect();
        let cursor = Arc::new(AtomicUsize::new(0));

        let stream = {
            let samples = Arc::clone(&samples);
            let cursor = Arc::clone(&cursor);
            self.device
                .build_output_stream(
                    &config,
                    move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        let mut at = cursor.load(Ordering::Relaxed);
                        for frame in out.chunks_mut(channels) {
                            frame.fill(samples.get(at).copied().unwrap_or(0.0));
                            at = (at + 1).min(samples.len());
                        }
                        cursor.store(at, Ordering::Relaxed);
                    },
                    |err| tracing::error!(error = %err, "speaker stream error"),
                    None,
                )
                .map_err(audio_error)?
        };
        stream.play().map_err(audio_error)?;

        let deadline = Instant::now() + clip.duration() + DRAIN_GRACE;
        let outcome = loop {
            if cancel.load(Ordering::SeqCst) {
                break Played::Cancelled;
            }
            if cursor.load(Ordering::Relaxed) >= samples.len() || Instant::now() > deadline {
                break Played::Finished;
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        drop(stream);
        tracing::debug!(?outcome, duration_ms = clip.duration().as_millis(), "playback ended");
        Ok(outcome)
    }
}

fn audio_error(e: impl std::fmt::Display) -> Error {
    Error::Audio(e.to_string())
}
