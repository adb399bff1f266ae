//! Runtime configuration read from the environment (and `.env`).

use crate::prompt::DEFAULT_LANGUAGE;
use crate::serial::ContextWindow;
use crate::speech::DEFAULT_VOICE;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set - add it to .env or the environment")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Connection settings for the chat service.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: Option<String>,
    pub chapter_deployment: String,
    pub summary_deployment: Option<String>,
}

/// Connection settings for the speech service.
#[derive(Debug, Clone)]
pub struct SpeechSettings {
    pub api_key: String,
    pub region: String,
}

/// Everything the binary needs to wire up a session.
#[derive(Debug, Clone)]
pub struct StoryConfig {
    pub chat: Option<ChatSettings>,
    pub speech: Option<SpeechSettings>,
    pub voice: String,
    pub data_dir: PathBuf,
    pub language: String,
    pub context_window: ContextWindow,
    pub request_timeout: Duration,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            chat: None,
            speech: None,
            voice: DEFAULT_VOICE.to_string(),
            data_dir: PathBuf::from("."),
            language: DEFAULT_LANGUAGE.to_string(),
            context_window: ContextWindow::All,
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl StoryConfig {
    /// Load `.env` if present, then read the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let chat = ChatSettings {
            endpoint: require("AZURE_OPENAI_ENDPOINT")?,
            api_key: require("AZURE_OPENAI_API_KEY")?,
            api_version: get("AZURE_OPENAI_API_VERSION"),
            chapter_deployment: require("AZURE_OPENAI_DEPLOYMENT_NAME")?,
            summary_deployment: get("AZURE_OPENAI_SUMMARY_DEPLOYMENT"),
        };

        let speech = match (get("AZURE_SPEECH_KEY"), get("AZURE_SPEECH_REGION")) {
            (Some(api_key), Some(region)) => Some(SpeechSettings { api_key, region }),
            _ => None,
        };

        let mut config = Self {
            chat: Some(chat),
            speech,
            ..Self::default()
        };

        if let Some(voice) = get("BEDTIME_VOICE") {
            config.voice = voice;
        }
        if let Some(dir) = get("BEDTIME_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(language) = get("BEDTIME_LANGUAGE") {
            config.language = language;
        }
        if let Some(value) = get("BEDTIME_CONTEXT_CHAPTERS") {
            let k = parse_number("BEDTIME_CONTEXT_CHAPTERS", &value)?;
            config.context_window = ContextWindow::Recent(k as usize);
        }
        if let Some(value) = get("BEDTIME_REQUEST_TIMEOUT_SECS") {
            let secs = parse_number("BEDTIME_REQUEST_TIMEOUT_SECS", &value)?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn parse_number(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ConfigError::Invalid {
            name,
            value: value.to_string(),
        })
}
