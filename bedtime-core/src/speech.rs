//! Turning finished stories into audio files.

use async_trait::async_trait;
use azure::AzureSpeech;
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Voice used when none is configured.
pub const DEFAULT_VOICE: &str = "zh-CN-XiaoxiaoNeural";

/// Failure producing an audio file.
#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech service error: {0}")]
    Service(#[from] azure::Error),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

/// A text-to-speech service.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, SpeechError>;
}

#[async_trait]
impl SpeechSynthesizer for AzureSpeech {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, SpeechError> {
        Ok(AzureSpeech::synthesize(self, text, voice).await?)
    }
}

/// `<prefix>_<YYYYmmdd_HHMMSS>.mp3`
pub fn audio_file_name(prefix: &str, at: DateTime<Local>) -> String {
    format!("{prefix}_{}.mp3", at.format("%Y%m%d_%H%M%S"))
}

/// Writes narrated audio into the data directory.
pub struct Narrator {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    voice: String,
    dir: PathBuf,
}

impl Narrator {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        voice: impl Into<String>,
        dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            synthesizer,
            voice: voice.into(),
            dir: dir.into(),
        }
    }

    /// Synthesize `text` and write it to a timestamped file.
    pub async fn narrate(&self, text: &str, prefix: &str) -> Result<PathBuf, SpeechError> {
        let audio = self.synthesizer.synthesize(text, &self.voice).await?;
        let path = self.dir.join(audio_file_name(prefix, Local::now()));

        tokio::fs::write(&path, audio)
            .await
            .map_err(|source| SpeechError::Io {
                path: path.clone(),
                source,
            })?;

        tracing::info!(path = %path.display(), "audio saved");
        Ok(path)
    }
}
