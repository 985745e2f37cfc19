//! Wake word matching
//!
//! Checks recognized transcripts for a configured wake phrase and splits off
//! the command spoken after it.

/// Result of matching a transcript against the wake words
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakeMatch {
    /// The wake word that matched
    pub wake_word: String,
    /// Text after the wake word, or `None` for a bare wake word
    pub command: Option<String>,
}

/// Matches transcripts against a set of wake words
#[derive(Debug, Clone, Default)]
pub struct WakeWordMatcher {
    /// Normalized, longest first
    wake_words: Vec<String>,
}

impl WakeWordMatcher {
    /// Create a matcher; words are lower-cased and trimmed, blanks dropped
    #[must_use]
    pub fn new<I, S>(wake_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = wake_words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        normalized.sort_by_key(|w| std::cmp::Reverse(w.len()));
        normalized.dedup();

        tracing::debug!(wake_words = ?normalized, "wake word matcher initialized");
        Self {
            wake_words: normalized,
        }
    }

    /// Configured wake words, longest first
    #[must_use]
    pub fn wake_words(&self) -> &[String] {
        &self.wake_words
    }

    /// Whether the transcript contains any wake word
    #[must_use]
    pub fn contains_wake_word(&self, transcript: &str) -> bool {
        self.detect(transcript).is_some()
    }

    /// Find the longest wake word in the transcript and extract the command
    #[must_use]
    pub fn detect(&self, transcript: &str) -> Option<WakeMatch> {
        let lowered = transcript.to_lowercase();

        self.wake_words.iter().find_map(|wake_word| {
            let start = lowered.find(wake_word.as_str())?;
            let end = start + wake_word.len();
            tracing::info!(wake_word, transcript, "wake word detected");
            Some(WakeMatch {
                wake_word: wake_word.clone(),
                command: extract_command(&lowered, transcript, end),
            })
        })
    }
}

/// Text after byte offset `end` of the lower-cased transcript, in original case
fn extract_command(lowered: &str, original: &str, end: usize) -> Option<String> {
    // Lower-casing can change byte lengths; fall back to the lowered text then
    let tail = if lowered.len() == original.len() && original.is_char_boundary(end) {
        &original[end..]
    } else {
        &lowered[end..]
    };
    let command = tail.trim_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation());
    (!command.is_empty()).then(|| command.to_string())
}
