//! StorySession - the primary public API for generating stories.
//!
//! Wraps the summary negotiator, the serial engine, the store and the
//! optional narrator behind one handle, so a front end only deals with
//! plain values and menu decisions.

use crate::config::{ConfigError, StoryConfig};
use crate::generator::{AzureGenerator, TextGenerator};
use crate::prompt::PromptBuilder;
use crate::serial::{ContextWindow, SerialEngine, SerialStoryRecord, StoryRequest};
use crate::setting::Setting;
use crate::speech::{Narrator, SpeechError};
use crate::standalone::generate_standalone;
use crate::store::{StoreError, StoryStore};
use crate::summary::{SelectOutcome, SummaryChooser, SummaryNegotiator};
use azure::{AzureOpenAi, AzureSpeech};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors from StorySession operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("client setup failed: {0}")]
    Client(#[from] azure::Error),
}

/// Which kind of story the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryType {
    Standalone,
    Serial,
}

impl StoryType {
    /// Menu numbering: 1 = standalone, 2 = serial.
    pub fn from_menu(choice: usize) -> Option<Self> {
        match choice {
            1 => Some(StoryType::Standalone),
            2 => Some(StoryType::Serial),
            _ => None,
        }
    }
}

/// What to do with a stored serial story in the chosen setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeChoice {
    Continue,
    Reread,
    StartNew,
    ViewFullText,
}

/// Whether a stored serial story can be picked up.
#[derive(Debug, Clone, PartialEq)]
pub enum ResumeOffer {
    /// Nothing to resume; a new story is implied.
    Fresh,
    InProgress(SerialStoryRecord),
    Completed(SerialStoryRecord),
}

impl ResumeOffer {
    /// Choices to present, in menu order.
    pub fn choices(&self) -> &'static [ResumeChoice] {
        match self {
            ResumeOffer::Fresh => &[],
            ResumeOffer::InProgress(_) => &[
                ResumeChoice::Continue,
                ResumeChoice::StartNew,
                ResumeChoice::ViewFullText,
            ],
            ResumeOffer::Completed(_) => &[
                ResumeChoice::Reread,
                ResumeChoice::StartNew,
                ResumeChoice::ViewFullText,
            ],
        }
    }
}

/// How a story-creating call ended.
#[derive(Debug, Clone, PartialEq)]
pub enum StoryOutcome<T> {
    Created(T),
    /// The user quit during summary selection.
    Aborted,
    /// No usable summary after every attempt.
    NoSummary,
    /// The story request itself failed.
    GenerationFailed,
}

/// A story-telling session for one child.
pub struct StorySession {
    generator: Arc<dyn TextGenerator>,
    prompts: PromptBuilder,
    negotiator: SummaryNegotiator,
    engine: SerialEngine,
    narrator: Option<Narrator>,
    months: u32,
}

impl StorySession {
    /// Create a session for a child of `months` months.
    pub fn new(generator: Arc<dyn TextGenerator>, store: StoryStore, months: u32) -> Self {
        Self {
            negotiator: SummaryNegotiator::new(generator.clone()),
            engine: SerialEngine::new(generator.clone(), store),
            generator,
            prompts: PromptBuilder::default(),
            narrator: None,
            months,
        }
    }

    /// Wire up the Azure services described by `config`.
    pub fn from_config(config: &StoryConfig, store: StoryStore, months: u32) -> Result<Self, SessionError> {
        let chat = config
            .chat
            .as_ref()
            .ok_or(ConfigError::Missing("AZURE_OPENAI_ENDPOINT"))?;

        let mut client = AzureOpenAi::new(&chat.endpoint, &chat.api_key, &chat.chapter_deployment)?
            .with_timeout(config.request_timeout)?;
        if let Some(version) = &chat.api_version {
            client = client.with_api_version(version);
        }

        let mut generator = AzureGenerator::new(client);
        if let Some(deployment) = &chat.summary_deployment {
            generator = generator.with_summary_deployment(deployment);
        }

        let narrator = match &config.speech {
            Some(speech) => {
                let client = AzureSpeech::new(&speech.region, &speech.api_key)?
                    .with_timeout(config.request_timeout)?;
                Some(Narrator::new(Arc::new(client), &config.voice, store.dir()))
            }
            None => None,
        };

        let mut session = Self::new(Arc::new(generator), store, months)
            .with_prompt_builder(PromptBuilder::new(&config.language))
            .with_context_window(config.context_window);
        session.narrator = narrator;
        Ok(session)
    }

    pub fn with_prompt_builder(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_negotiator(mut self, negotiator: SummaryNegotiator) -> Self {
        self.negotiator = negotiator;
        self
    }

    pub fn with_context_window(mut self, window: ContextWindow) -> Self {
        self.engine = SerialEngine::new(self.generator.clone(), self.engine.store().clone())
            .with_context_window(window);
        self
    }

    pub fn with_narrator(mut self, narrator: Narrator) -> Self {
        self.narrator = Some(narrator);
        self
    }

    pub fn months(&self) -> u32 {
        self.months
    }

    pub fn store(&self) -> &StoryStore {
        self.engine.store()
    }

    pub fn engine(&self) -> &SerialEngine {
        &self.engine
    }

    pub fn can_narrate(&self) -> bool {
        self.narrator.is_some()
    }

    /// Base prompt for `request` at the child's current age.
    pub fn base_prompt(&self, request: &StoryRequest) -> String {
        request.base_prompt(&self.prompts, self.months)
    }

    /// Decide whether to offer resuming the stored serial story.
    ///
    /// Only a serial request in the same setting as the stored record qualifies.
    pub async fn resume_offer(
        &self,
        story_type: StoryType,
        setting: Setting,
    ) -> Result<ResumeOffer, StoreError> {
        if story_type != StoryType::Serial {
            return Ok(ResumeOffer::Fresh);
        }

        let offer = match self.store().load().await? {
            Some(record) if record.setting == setting => {
                if record.is_complete() {
                    ResumeOffer::Completed(record)
                } else {
                    ResumeOffer::InProgress(record)
                }
            }
            _ => ResumeOffer::Fresh,
        };
        Ok(offer)
    }

    /// The stored serial story that starting a new one in `setting` would replace.
    ///
    /// A story in the same setting is not reported: choosing to start over is
    /// already part of its resume menu. Completed stories are reported too.
    pub async fn superseded_story(
        &self,
        setting: Setting,
    ) -> Result<Option<SerialStoryRecord>, StoreError> {
        let stored = self.store().load().await?;
        Ok(stored.filter(|record| record.setting != setting))
    }

    /// Negotiate a summary and write a standalone story from it.
    pub async fn standalone(
        &self,
        request: &StoryRequest,
        chooser: &mut dyn SummaryChooser,
    ) -> StoryOutcome<String> {
        let base_prompt = self.base_prompt(request);
        let summary = match self.negotiator.select_summary(&base_prompt, chooser).await {
            SelectOutcome::Selected(summary) => summary,
            SelectOutcome::Aborted => return StoryOutcome::Aborted,
            SelectOutcome::Exhausted => return StoryOutcome::NoSummary,
        };

        match generate_standalone(self.generator.as_ref(), &base_prompt, &summary).await {
            Some(story) => StoryOutcome::Created(story),
            None => StoryOutcome::GenerationFailed,
        }
    }

    /// Negotiate a summary and start a new serial story with chapter 1.
    ///
    /// The stored story, if any, is replaced only when chapter 1 is saved.
    pub async fn start_serial(
        &self,
        request: &StoryRequest,
        chooser: &mut dyn SummaryChooser,
    ) -> Result<StoryOutcome<SerialStoryRecord>, StoreError> {
        let base_prompt = self.base_prompt(request);
        let summary = match self.negotiator.select_summary(&base_prompt, chooser).await {
            SelectOutcome::Selected(summary) => summary,
            SelectOutcome::Aborted => return Ok(StoryOutcome::Aborted),
            SelectOutcome::Exhausted => return Ok(StoryOutcome::NoSummary),
        };

        let outcome = match self.engine.start(&base_prompt, request, &summary).await? {
            Some(record) => StoryOutcome::Created(record),
            None => StoryOutcome::GenerationFailed,
        };
        Ok(outcome)
    }

    /// Generate the next chapter of `record` from its own stored inputs.
    pub async fn continue_serial(
        &self,
        record: &mut SerialStoryRecord,
    ) -> Result<Option<String>, StoreError> {
        let base_prompt = self.base_prompt(&record.request());
        self.engine.continue_story(record, &base_prompt).await
    }

    /// Narrate `text` into `<prefix>_<timestamp>.mp3`, if speech is configured.
    pub async fn narrate(&self, text: &str, prefix: &str) -> Option<Result<PathBuf, SpeechError>> {
        let narrator = self.narrator.as_ref()?;
        let result = narrator.narrate(text, prefix).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "speech synthesis failed");
        }
        Some(result)
    }
}
