//! Bedtime story engine for young children.
//!
//! This crate provides:
//! - Age-aware prompt construction
//! - Summary negotiation with length validation and bounded retries
//! - Standalone stories and 28-chapter serial stories
//! - Persistence of the child profile and the in-progress serial story
//! - Optional narration to audio files
//!
//! # Quick Start
//!
//! ```ignore
//! use bedtime_core::{Setting, StoryConfig, StoryRequest, StorySession, StoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StoryConfig::from_env()?;
//!     let store = StoryStore::new(&config.data_dir);
//!     let session = StorySession::from_config(&config, store, 48)?;
//!
//!     let request = StoryRequest::new("a rabbit named Beibei", Setting::Forest, "friendship");
//!     let mut chooser = my_terminal_chooser();
//!     let outcome = session.start_serial(&request, &mut chooser).await?;
//!     Ok(())
//! }
//! ```

pub mod age;
pub mod config;
pub mod generator;
pub mod profile;
pub mod prompt;
pub mod serial;
pub mod session;
pub mod setting;
pub mod speech;
pub mod standalone;
pub mod store;
pub mod summary;
pub mod testing;

// Primary public API
pub use config::{ConfigError, StoryConfig};
pub use generator::{AzureGenerator, GenerationRequest, GeneratorError, Purpose, TextGenerator};
pub use profile::{parse_age_input, ChildProfile, ProfileError};
pub use prompt::PromptBuilder;
pub use serial::{ContextWindow, SerialEngine, SerialStoryRecord, StoryRequest, TOTAL_CHAPTERS};
pub use session::{ResumeChoice, ResumeOffer, SessionError, StoryOutcome, StorySession, StoryType};
pub use setting::Setting;
pub use speech::{Narrator, SpeechError, SpeechSynthesizer};
pub use store::{ResetReport, StoreError, StoryStore};
pub use summary::{SelectOutcome, SummaryChoice, SummaryChooser, SummaryNegotiator};
pub use testing::{MockGenerator, MockSpeech, ScriptedChooser};
