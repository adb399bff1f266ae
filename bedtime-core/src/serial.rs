//! Serial stories: a fixed 28-chapter arc generated one chapter per session.
//!
//! [`SerialStoryRecord`] is the persisted state; [`SerialEngine`] advances it.
//! A record always holds exactly `current_chapter` chapters, and
//! `current_chapter` only ever grows by one per successful generation.

use crate::generator::{GenerationRequest, Purpose, Sampling, TextGenerator};
use crate::prompt::PromptBuilder;
use crate::setting::Setting;
use crate::store::{StoreError, StoryStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Length of every serial story.
pub const TOTAL_CHAPTERS: u32 = 28;

/// Characters of each chapter shown in the progress view.
const PREVIEW_CHARS: usize = 100;

const SERIAL_SYSTEM_PROMPT: &str = "You are a professional children's story writer who \
     specializes in serialized stories. Make sure the story is suitable for children and \
     that the content is positive and uplifting.";

/// The inputs a story is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryRequest {
    pub character: String,
    pub setting: Setting,
    pub elements: String,
}

impl StoryRequest {
    pub fn new(character: impl Into<String>, setting: Setting, elements: impl Into<String>) -> Self {
        Self {
            character: character.into(),
            setting,
            elements: elements.into(),
        }
    }

    /// Base prompt for a child of `months` months.
    pub fn base_prompt(&self, prompts: &PromptBuilder, months: u32) -> String {
        prompts.build(months, &self.character, &self.elements, self.setting)
    }
}

/// Persisted serial-story state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialStoryRecord {
    #[serde(default = "Uuid::new_v4")]
    pub story_id: Uuid,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    pub character: String,
    pub setting: Setting,
    pub elements: String,
    pub current_chapter: u32,
    pub chapters: Vec<String>,
    pub story_summary: Option<String>,
}

impl SerialStoryRecord {
    /// A fresh record holding its first chapter.
    pub fn new(
        character: impl Into<String>,
        setting: Setting,
        elements: impl Into<String>,
        story_summary: Option<String>,
        first_chapter: impl Into<String>,
    ) -> Self {
        Self {
            story_id: Uuid::new_v4(),
            created_at: Utc::now(),
            character: character.into(),
            setting,
            elements: elements.into(),
            current_chapter: 1,
            chapters: vec![first_chapter.into()],
            story_summary,
        }
    }

    /// The inputs this story was started with.
    pub fn request(&self) -> StoryRequest {
        StoryRequest::new(self.character.clone(), self.setting, self.elements.clone())
    }

    /// First eight hex digits of the story id, for display.
    pub fn short_id(&self) -> String {
        self.story_id.simple().to_string().chars().take(8).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.current_chapter >= TOTAL_CHAPTERS
    }

    /// Number of the chapter that would be generated next, if any.
    pub fn next_chapter(&self) -> Option<u32> {
        (!self.is_complete()).then_some(self.current_chapter + 1)
    }

    /// Append the next chapter. Returns `false` and changes nothing once complete.
    pub fn append_chapter(&mut self, text: impl Into<String>) -> bool {
        if self.is_complete() {
            return false;
        }
        self.chapters.push(text.into());
        self.current_chapter += 1;
        true
    }

    /// Short overview: inputs, progress and a preview of each chapter.
    pub fn progress(&self) -> String {
        let mut out = format!(
            "Character: {}\nSetting: {}\nElements: {}\nProgress: chapter {} / {}\n",
            self.character, self.setting, self.elements, self.current_chapter, TOTAL_CHAPTERS
        );
        for (i, chapter) in self.chapters.iter().enumerate() {
            out.push_str(&format!("\nChapter {}:\n{}\n", i + 1, preview(chapter)));
        }
        out
    }

    /// Summary followed by every chapter in full.
    pub fn full_text(&self) -> String {
        let mut out = String::new();
        if let Some(summary) = &self.story_summary {
            out.push_str(&format!("Summary:\n{summary}\n"));
        }
        for (i, chapter) in self.chapters.iter().enumerate() {
            out.push_str(&format!("\nChapter {}:\n{chapter}\n", i + 1));
        }
        out
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let truncated: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

/// Where a chapter sits in the arc; picks the closing instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterPosition {
    Opening,
    Middle,
    Finale,
}

impl ChapterPosition {
    pub fn of(chapter: u32) -> Self {
        match chapter {
            1 => ChapterPosition::Opening,
            TOTAL_CHAPTERS => ChapterPosition::Finale,
            _ => ChapterPosition::Middle,
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            ChapterPosition::Opening => {
                "This is the first chapter. Lay the groundwork for the whole story by \
                 introducing the main characters and the setting."
            }
            ChapterPosition::Middle => {
                "Keep developing the plot, stay consistent with the previous chapters, \
                 and leave a hint of what comes in the next chapter."
            }
            ChapterPosition::Finale => {
                "This is the final chapter. Bring the whole story to a happy close and \
                 make sure every plot thread is resolved."
            }
        }
    }
}

/// How many previous chapters are fed back as continuity context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextWindow {
    /// Every previous chapter, verbatim.
    #[default]
    All,
    /// Only the most recent `k` chapters. The summary is always included.
    Recent(usize),
}

impl ContextWindow {
    /// The slice of `previous` to include, with the 1-based number of its first chapter.
    pub fn select<'a>(&self, previous: &'a [String]) -> (usize, &'a [String]) {
        match *self {
            ContextWindow::All => (1, previous),
            ContextWindow::Recent(k) => {
                let start = previous.len().saturating_sub(k);
                (start + 1, &previous[start..])
            }
        }
    }
}

/// Drives chapter-by-chapter generation and persistence.
pub struct SerialEngine {
    generator: Arc<dyn TextGenerator>,
    store: StoryStore,
    window: ContextWindow,
}

impl SerialEngine {
    pub fn new(generator: Arc<dyn TextGenerator>, store: StoryStore) -> Self {
        Self {
            generator,
            store,
            window: ContextWindow::All,
        }
    }

    pub fn with_context_window(mut self, window: ContextWindow) -> Self {
        self.window = window;
        self
    }

    pub fn store(&self) -> &StoryStore {
        &self.store
    }

    /// Compose the prompt for chapter `chapter`.
    pub fn chapter_prompt(
        &self,
        base_prompt: &str,
        chapter: u32,
        previous: &[String],
        summary: Option<&str>,
    ) -> String {
        let mut prompt = format!("{base_prompt}\n\nThis is chapter {chapter} of {TOTAL_CHAPTERS}.");

        if let Some(summary) = summary.filter(|s| !s.is_empty()) {
            prompt.push_str(&format!("\n\nStory summary:\n{summary}"));
        }

        let (first, context) = self.window.select(previous);
        if !context.is_empty() {
            if first == 1 {
                prompt.push_str("\n\nThe story so far:\n");
            } else {
                prompt.push_str(&format!(
                    "\n\nThe story so far (chapters {first} to {}):\n",
                    previous.len()
                ));
            }
            prompt.push_str(&context.join("\n"));
        }

        prompt.push('\n');
        prompt.push_str(ChapterPosition::of(chapter).instruction());
        prompt
    }

    /// Generate the text of chapter `chapter`.
    ///
    /// Chapters outside `1..=28` return `None` without contacting the
    /// service. A service failure is logged and also yields `None`; there is
    /// no retry here.
    pub async fn generate_chapter(
        &self,
        base_prompt: &str,
        chapter: u32,
        previous: &[String],
        summary: Option<&str>,
    ) -> Option<String> {
        if chapter == 0 || chapter > TOTAL_CHAPTERS {
            tracing::info!(chapter, "chapter outside the arc; nothing generated");
            return None;
        }

        let prompt = self.chapter_prompt(base_prompt, chapter, previous, summary);
        tracing::debug!(chapter, prompt_chars = prompt.chars().count(), "generating chapter");

        let request =
            GenerationRequest::new(Purpose::Chapter, SERIAL_SYSTEM_PROMPT, prompt, Sampling::NARRATIVE);

        match self.generator.generate(request).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(chapter, error = %e, "chapter generation failed");
                None
            }
        }
    }

    /// Start a new serial story and persist it once chapter 1 exists.
    ///
    /// Any previously stored story is only overwritten if generation succeeds.
    pub async fn start(
        &self,
        base_prompt: &str,
        request: &StoryRequest,
        summary: &str,
    ) -> Result<Option<SerialStoryRecord>, StoreError> {
        let Some(first) = self.generate_chapter(base_prompt, 1, &[], Some(summary)).await else {
            return Ok(None);
        };

        let record = SerialStoryRecord::new(
            request.character.clone(),
            request.setting,
            request.elements.clone(),
            Some(summary.to_string()),
            first,
        );
        self.store.save(&record).await?;
        tracing::info!(story_id = %record.story_id, "serial story started");
        Ok(Some(record))
    }

    /// Generate, append and persist the next chapter of `record`.
    ///
    /// Returns the new chapter's text. On generation or save failure `record`
    /// is left exactly as it was.
    pub async fn continue_story(
        &self,
        record: &mut SerialStoryRecord,
        base_prompt: &str,
    ) -> Result<Option<String>, StoreError> {
        let Some(next) = record.next_chapter() else {
            tracing::info!(story_id = %record.story_id, "story already complete");
            return Ok(None);
        };

        let Some(text) = self
            .generate_chapter(
                base_prompt,
                next,
                &record.chapters,
                record.story_summary.as_deref(),
            )
            .await
        else {
            return Ok(None);
        };

        let mut updated = record.clone();
        if !updated.append_chapter(text.clone()) {
            return Ok(None);
        }
        self.store.save(&updated).await?;
        *record = updated;
        Ok(Some(text))
    }
}
