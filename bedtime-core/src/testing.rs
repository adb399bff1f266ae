//! Testing utilities for the story engine.
//!
//! This module provides tools for integration testing:
//! - `MockGenerator` for deterministic generation without API calls
//! - `MockSpeech` for narration without the speech service
//! - `ScriptedChooser` for driving summary selection
//! - Helpers for building valid candidate batches and checking prompts

use crate::generator::{GenerationRequest, GeneratorError, TextGenerator};
use crate::speech::{SpeechError, SpeechSynthesizer};
use crate::summary::{SummaryChoice, SummaryChooser};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A text generator that returns scripted responses in order.
///
/// Every request is recorded. Once the script runs out, further calls fail.
pub struct MockGenerator {
    responses: Mutex<VecDeque<Result<String, GeneratorError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockGenerator {
    pub fn new(responses: Vec<Result<String, GeneratorError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A generator with no script; every call fails.
    pub fn failing() -> Self {
        Self::new(Vec::new())
    }

    /// All requests received so far.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        lock(&self.requests).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// User prompt of the most recent request.
    pub fn last_prompt(&self) -> Option<String> {
        lock(&self.requests)
            .last()
            .map(|r| r.user_prompt().to_string())
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GeneratorError> {
        lock(&self.requests).push(request);
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| Err(GeneratorError::Other("no more scripted responses".into())))
    }
}

/// A speech synthesizer that "speaks" by returning the text's bytes.
#[derive(Default)]
pub struct MockSpeech {
    fail: bool,
    voices: Mutex<Vec<String>>,
}

impl MockSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Voices requested so far, one entry per call.
    pub fn voices(&self) -> Vec<String> {
        lock(&self.voices).clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSpeech {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, SpeechError> {
        lock(&self.voices).push(voice.to_string());
        if self.fail {
            return Err(SpeechError::Other("speech unavailable".into()));
        }
        Ok(text.as_bytes().to_vec())
    }
}

/// A summary chooser that plays back a fixed list of answers.
///
/// Answers `Quit` once the script is exhausted.
#[derive(Debug, Default)]
pub struct ScriptedChooser {
    script: VecDeque<SummaryChoice>,
    shown: Vec<Vec<String>>,
    rejected: Vec<SummaryChoice>,
}

impl ScriptedChooser {
    pub fn new(script: impl IntoIterator<Item = SummaryChoice>) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Pick the candidate with this 1-based menu number.
    pub fn picking(number: usize) -> Self {
        Self::new([SummaryChoice::Select(number.saturating_sub(1))])
    }

    /// Every candidate list shown, in order.
    pub fn shown(&self) -> &[Vec<String>] {
        &self.shown
    }

    /// Out-of-range choices, in order.
    pub fn rejections(&self) -> &[SummaryChoice] {
        &self.rejected
    }
}

impl SummaryChooser for ScriptedChooser {
    fn choose(&mut self, candidates: &[String]) -> SummaryChoice {
        self.shown.push(candidates.to_vec());
        self.script.pop_front().unwrap_or(SummaryChoice::Quit)
    }

    fn rejected(&mut self, choice: SummaryChoice) {
        self.rejected.push(choice);
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// A candidate summary of exactly 50 countable characters.
pub fn candidate(n: usize) -> String {
    format!("第{n}个故事{}", "星".repeat(45 - n.to_string().chars().count() + 1))
}

/// A response holding three valid numbered candidates.
pub fn candidate_batch() -> String {
    format!("1. {}\n2. {}\n3. {}", candidate(1), candidate(2), candidate(3))
}

// ============================================================================
// Assertion helpers
// ============================================================================

/// Assert that the most recent request's prompt contains `needle`.
pub fn assert_last_prompt_contains(mock: &MockGenerator, needle: &str) {
    let prompt = mock.last_prompt().unwrap_or_default();
    assert!(
        prompt.contains(needle),
        "Expected last prompt to contain {needle:?}, got:\n{prompt}"
    );
}

/// Assert the number of service calls made.
pub fn assert_calls(mock: &MockGenerator, expected: usize) {
    assert_eq!(
        mock.call_count(),
        expected,
        "Expected {expected} generation calls, got {}",
        mock.call_count()
    );
}
