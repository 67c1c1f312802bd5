//! Runtime configuration.
//!
//! Defaults match the hosted Nemotron setup; an optional `config.toml` in
//! the platform config directory overrides them. The API key is read
//! strictly from the environment and never written anywhere.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::provider;

/// Environment variable holding the NVIDIA API key.
pub const API_KEY_VAR: &str = "NVIDIA_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model identifier sent to the chat-completions endpoint.
    pub model: String,
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub tts: TtsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "nvidia/nemotron-3-nano-30b-a3b".to_string(),
            base_url: "https://integrate.api.nvidia.com/v1".to_string(),
            max_tokens: 16384,
            temperature: 1.0,
            top_p: 1.0,
            tts: TtsConfig::default(),
        }
    }
}

/// Text-to-speech configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Master switch. When false, chat mode is text-only.
    pub enabled: bool,
    /// Path to the piper executable. None = look up `piper` on PATH.
    pub piper_bin: Option<PathBuf>,
    /// Path to the piper voice model (.onnx). Required for TTS.
    pub voice_model: Option<PathBuf>,
    /// Output sample rate of the voice model, in Hz.
    pub sample_rate: u32,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            piper_bin: None,
            voice_model: None,
            sample_rate: 22050,
        }
    }
}

impl Config {
    /// Load configuration from `config.toml` in the platform config
    /// directory, falling back to defaults when the file is absent.
    pub fn load() -> Result<Self> {
        let config_path = dirs::config_dir()
            .map(|d| d.join("mikasa").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".mikasa/config.toml"));

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| Error::Config(format!("{}: {e}", config_path.display())))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Resolve the API key from the environment.
    ///
    /// Must be called before any request is issued; a missing or empty
    /// value is a configuration error, not a request failure.
    pub fn api_key(&self) -> std::result::Result<String, provider::Error> {
        resolve_api_key(std::env::var(API_KEY_VAR).ok())
    }
}

fn resolve_api_key(value: Option<String>) -> std::result::Result<String, provider::Error> {
    match value {
        Some(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(provider::Error::MissingApiKey {
            env_var: API_KEY_VAR.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_hosted_nemotron() {
        let config = Config::default();
        assert_eq!(config.model, "nvidia/nemotron-3-nano-30b-a3b");
        assert_eq!(config.base_url, "https://integrate.api.nvidia.com/v1");
        assert_eq!(config.max_tokens, 16384);
        assert!(config.tts.enabled);
        assert_eq!(config.tts.sample_rate, 22050);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            model = "nvidia/other-model"

            [tts]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.model, "nvidia/other-model");
        assert_eq!(config.base_url, "https://integrate.api.nvidia.com/v1");
        assert!(!config.tts.enabled);
        assert_eq!(config.tts.sample_rate, 22050);
    }

    #[test]
    fn missing_key_is_config_error() {
        assert!(resolve_api_key(None).is_err());
        assert!(resolve_api_key(Some(String::new())).is_err());
        assert!(resolve_api_key(Some("   ".to_string())).is_err());
    }

    #[test]
    fn present_key_resolves() {
        let key = resolve_api_key(Some("nvapi-test".to_string())).unwrap();
        assert_eq!(key, "nvapi-test");
    }
}
