//! Voice settings
//!
//! Flat configuration record for recognition and synthesis. Read from the
//! `[voice]` table of the config file; every field is optional there.

use serde::{Deserialize, Serialize};

/// Languages offered for recognition
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("en-US", "English (US)"),
    ("en-GB", "English (UK)"),
    ("en-AU", "English (Australia)"),
    ("en-CA", "English (Canada)"),
];

/// Voice recognition and synthesis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    /// Phrases that activate the assistant in continuous mode
    pub wake_words: Vec<String>,
    /// Restart recognition after each turn and on silence
    pub continuous_listening: bool,
    /// Recognition locale
    pub language: String,
    /// Minimum transcript confidence (0.1 - 1.0)
    pub confidence_threshold: f32,
    /// Speech rate (0.5 - 2.0)
    pub tts_rate: f32,
    /// Speech pitch (0.5 - 2.0)
    pub tts_pitch: f32,
    /// Speech volume (0.0 - 1.0)
    pub tts_volume: f32,
    /// Preferred voice name; empty for the engine default
    pub tts_voice: String,
    /// Speak typed-chat replies aloud
    pub auto_speak: bool,
    pub sound_effects: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            wake_words: vec!["kyra".into(), "hey kyra".into(), "hello kyra".into()],
            continuous_listening: false,
            language: "en-US".to_string(),
            confidence_threshold: 0.7,
            tts_rate: 0.9,
            tts_pitch: 1.1,
            tts_volume: 0.8,
            tts_voice: String::new(),
            auto_speak: true,
            sound_effects: true,
        }
    }
}

impl VoiceSettings {
    /// Add a wake word (trimmed, lower-cased); returns false for blanks and duplicates
    pub fn add_wake_word(&mut self, word: &str) -> bool {
        let word = word.trim().to_lowercase();
        if word.is_empty() || self.wake_words.contains(&word) {
            return false;
        }
        self.wake_words.push(word);
        true
    }

    /// Remove a wake word; returns whether it was present
    pub fn remove_wake_word(&mut self, word: &str) -> bool {
        let before = self.wake_words.len();
        self.wake_words.retain(|w| w != word);
        self.wake_words.len() != before
    }

    /// Clamp numeric fields into their slider ranges
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.confidence_threshold = self.confidence_threshold.clamp(0.1, 1.0);
        self.tts_rate = self.tts_rate.clamp(0.5, 2.0);
        self.tts_pitch = self.tts_pitch.clamp(0.5, 2.0);
        self.tts_volume = self.tts_volume.clamp(0.0, 1.0);
        self
    }

    /// Whether `language` is one of [`SUPPORTED_LANGUAGES`]
    #[must_use]
    pub fn language_supported(&self) -> bool {
        SUPPORTED_LANGUAGES.iter().any(|(code, _)| *code == self.language)
    }
}
