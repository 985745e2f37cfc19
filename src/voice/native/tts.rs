//! Text-to-speech via `OpenAI`

use secrecy::{ExposeSecret, SecretString};

use crate::{Error, Result};

const SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";

/// Default synthesis model
pub const DEFAULT_TTS_MODEL: &str = "tts-1";

/// Voice used when none is configured
pub const DEFAULT_TTS_VOICE: &str = "alloy";

#[derive(serde::Serialize)]
struct TtsRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
}

/// Synthesizes MP3 speech
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
}

impl TextToSpeech {
    /// Create an `OpenAI` TTS client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.into(),
        })
    }

    /// Synthesize `text` to MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the API rejects it
    pub async fn synthesize(&self, text: &str, voice: Option<&str>, rate: f32) -> Result<Vec<u8>> {
        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: voice.unwrap_or(DEFAULT_TTS_VOICE),
            speed: rate.clamp(0.25, 4.0),
        };

        let response = self
            .client
            .post(SPEECH_URL)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        tracing::debug!(bytes = audio.len(), "speech synthesized");
        Ok(audio.to_vec())
    }
}
