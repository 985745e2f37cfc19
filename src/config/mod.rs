//! Configuration management for Kyra

pub mod file;

use std::path::PathBuf;

use secrecy::SecretString;

use crate::assistant::DEFAULT_MODEL;
use crate::voice::VoiceSettings;

/// Name the assistant answers to unless configured
pub const DEFAULT_ASSISTANT_NAME: &str = "Kyra";

/// Kyra configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API keys for external services
    pub api_keys: ApiKeys,

    /// Generative model identifier
    pub model: String,

    /// Assistant name used in prompts
    pub assistant_name: String,

    /// Directory holding the session document
    pub data_dir: PathBuf,

    /// Voice recognition and synthesis settings
    pub voice: VoiceSettings,
}

/// API keys for external services
///
/// A missing key is not a load error; it fails the operation that needs it.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// Gemini key (chat and voice replies)
    pub gemini: Option<SecretString>,

    /// `OpenWeather` key (weather widget)
    pub openweather: Option<SecretString>,

    /// `OpenAI` key (native Whisper STT and TTS)
    pub openai: Option<SecretString>,
}

impl Config {
    /// Load configuration (env > toml > default)
    #[must_use]
    pub fn load() -> Self {
        Self::from_sources(file::load_config_file(), |name| std::env::var(name).ok())
    }

    /// Resolve configuration from a parsed file and an environment lookup
    pub fn from_sources(fc: file::KyraConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let var = |names: &[&str]| names.iter().find_map(|name| env(name).filter(|v| !v.is_empty()));
        let secret = |value: Option<String>| value.map(SecretString::from);

        let api_keys = ApiKeys {
            gemini: secret(var(&["GEMINI_API_KEY", "VITE_GEMINI_API_KEY"]).or(fc.api_keys.gemini)),
            openweather: secret(
                var(&["OPENWEATHER_API_KEY", "VITE_OPENWEATHER_API_KEY"])
                    .or(fc.api_keys.openweather),
            ),
            openai: secret(var(&["OPENAI_API_KEY"]).or(fc.api_keys.openai)),
        };

        if api_keys.gemini.is_none() {
            tracing::warn!("no Gemini API key configured, replies will fail until GEMINI_API_KEY is set");
        }

        let model = var(&["KYRA_MODEL"])
            .or(fc.assistant.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let assistant_name = fc
            .assistant
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ASSISTANT_NAME.to_string());

        // Determine data directory (~/.local/share/kyra on Linux)
        let data_dir = var(&["KYRA_DATA_DIR"])
            .or(fc.storage.data_dir)
            .map_or_else(default_data_dir, PathBuf::from);

        Self {
            api_keys,
            model,
            assistant_name,
            data_dir,
            voice: fc.voice.clamped(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(|| PathBuf::from(".kyra"), |d| d.data_dir().join("kyra"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn file(toml: &str) -> file::KyraConfigFile {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn defaults_without_sources() {
        let config = Config::from_sources(file::KyraConfigFile::default(), env(&[]));
        assert!(config.api_keys.gemini.is_none());
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.assistant_name, "Kyra");
        assert_eq!(config.voice, VoiceSettings::default());
        assert!(config.data_dir.ends_with("kyra") || config.data_dir.ends_with(".kyra"));
    }

    #[test]
    fn env_overrides_file() {
        let fc = file("[api_keys]\ngemini = \"from-file\"\n[assistant]\nmodel = \"file-model\"");
        let config = Config::from_sources(
            fc,
            env(&[("GEMINI_API_KEY", "from-env"), ("KYRA_MODEL", "env-model")]),
        );
        assert_eq!(config.api_keys.gemini.unwrap().expose_secret(), "from-env");
        assert_eq!(config.model, "env-model");
    }

    #[test]
    fn file_used_when_env_missing() {
        let fc = file("[api_keys]\nopenweather = \"ow\"\n[storage]\ndata_dir = \"/tmp/kyra-data\"");
        let config = Config::from_sources(fc, env(&[]));
        assert_eq!(config.api_keys.openweather.unwrap().expose_secret(), "ow");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/kyra-data"));
    }

    #[test]
    fn vite_aliases_and_empty_values() {
        let config = Config::from_sources(
            file::KyraConfigFile::default(),
            env(&[
                ("GEMINI_API_KEY", ""),
                ("VITE_GEMINI_API_KEY", "vite"),
                ("VITE_OPENWEATHER_API_KEY", "vite-ow"),
            ]),
        );
        assert_eq!(config.api_keys.gemini.unwrap().expose_secret(), "vite");
        assert_eq!(config.api_keys.openweather.unwrap().expose_secret(), "vite-ow");
    }

    #[test]
    fn voice_values_are_clamped() {
        let fc = file("[voice]\ntts_rate = 5.0\nconfidence_threshold = 0.0");
        let config = Config::from_sources(fc, env(&[]));
        assert!((config.voice.tts_rate - 2.0).abs() < f32::EPSILON);
        assert!((config.voice.confidence_threshold - 0.1).abs() < f32::EPSILON);
    }
}
