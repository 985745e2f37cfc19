//! Error types for the Kyra assistant

use thiserror::Error;

/// Result type alias for Kyra operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Kyra assistant
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (missing API key, bad settings)
    #[error("configuration error: {0}")]
    Config(String),

    /// Session storage error
    #[error("storage error: {0}")]
    Storage(String),

    /// Malformed import or storage document
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// Chat session not found
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Generative AI provider error
    #[error("AI error: {0}")]
    Ai(String),

    /// Generative AI provider is overloaded (transient, retryable once)
    #[error("AI service overloaded: {0}")]
    Overloaded(String),

    /// Weather provider error
    #[error("weather error: {0}")]
    Weather(String),

    /// City lookup failed at the weather provider
    #[error(
        "City not found: {0}. Try using the full city name or adding country code (e.g., \"New York, US\")"
    )]
    CityNotFound(String),

    /// Voice processing error
    #[error("voice error: {0}")]
    Voice(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Whether this error belongs to the upstream-overload class
    #[must_use]
    pub const fn is_overloaded(&self) -> bool {
        matches!(self, Self::Overloaded(_))
    }

    /// Whether this error is a configuration problem (e.g. missing credentials)
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
