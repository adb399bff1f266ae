//! Summary negotiation.
//!
//! Asks the generator for three numbered synopses, checks each against the
//! length window, and lets the caller pick one. Both the inner regeneration
//! on validation failure and the outer retry on service failure are bounded.

use crate::generator::{GenerationRequest, Purpose, Sampling, TextGenerator};
use std::sync::Arc;
use std::time::Duration;

/// Number of candidates offered per round.
pub const CANDIDATE_COUNT: usize = 3;

/// Inclusive length window, counted in non-whitespace characters.
pub const MIN_SUMMARY_CHARS: usize = 40;
pub const MAX_SUMMARY_CHARS: usize = 60;

/// Outer attempts in [`SummaryNegotiator::select_summary`].
pub const DEFAULT_SELECT_ATTEMPTS: usize = 3;

/// Requests per [`SummaryNegotiator::generate_candidates`] call before giving up.
pub const DEFAULT_GENERATION_ATTEMPTS: usize = 3;

/// Pause between failed outer attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(3);

const SEPARATORS: [&str; 3] = [". ", "、", "．"];

const PLANNER_SYSTEM_PROMPT: &str = "You are a professional children's story planner. \
     Make sure every story summary is between 40 and 60 characters long.";

const CANDIDATE_INSTRUCTIONS: &str = "\nBased on the requirements above, write three story \
     summaries that each go in a different direction:\n\
     1. Each summary must be between 40 and 60 characters long\n\
     2. Number the three summaries 1. 2. 3.\n\
     3. Each summary should cover the main character, the setting, the main plot and the ending\n\
     4. Keep the three summaries consistent in style but different in content\n\
     5. Check the length carefully so that every summary is between 40 and 60 characters";

/// Characters that count toward the length window.
pub fn count_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Whether a candidate fits the length window.
pub fn is_valid_length(text: &str) -> bool {
    (MIN_SUMMARY_CHARS..=MAX_SUMMARY_CHARS).contains(&count_chars(text))
}

/// Split generator output into numbered candidates.
///
/// A line starting with a single digit and one of the recognized separators
/// opens a new candidate; following non-empty lines are joined onto it with a
/// space. Lines before the first numbered marker are ignored.
pub fn parse_candidates(text: &str) -> Vec<String> {
    let mut candidates = Vec::new();
    let mut current: Option<Vec<&str>> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(rest) = strip_marker(line) {
            if let Some(parts) = current.take() {
                candidates.push(join_parts(&parts));
            }
            current = Some(vec![rest]);
        } else if let Some(parts) = current.as_mut() {
            parts.push(line);
        }
    }

    if let Some(parts) = current {
        candidates.push(join_parts(&parts));
    }
    candidates
}

fn strip_marker(line: &str) -> Option<&str> {
    let mut chars = line.chars();
    if !chars.next()?.is_ascii_digit() {
        return None;
    }
    let rest = chars.as_str();
    SEPARATORS
        .iter()
        .find_map(|sep| rest.strip_prefix(sep))
        .map(str::trim)
}

fn join_parts(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Why a batch of candidates was thrown away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    TooFew { found: usize },
    BadLength { index: usize, chars: usize },
    /// Candidate `index` repeats an earlier one, ignoring whitespace.
    Duplicate { index: usize },
}

/// Check a parsed batch. On success returns exactly the first three candidates,
/// each inside the length window and no two alike.
pub fn validate_candidates(mut candidates: Vec<String>) -> Result<Vec<String>, Rejection> {
    if candidates.len() < CANDIDATE_COUNT {
        return Err(Rejection::TooFew {
            found: candidates.len(),
        });
    }
    candidates.truncate(CANDIDATE_COUNT);

    if let Some((index, chars)) = candidates
        .iter()
        .map(|c| count_chars(c))
        .enumerate()
        .find(|(_, chars)| !(MIN_SUMMARY_CHARS..=MAX_SUMMARY_CHARS).contains(chars))
    {
        return Err(Rejection::BadLength { index, chars });
    }

    let squeezed: Vec<String> = candidates
        .iter()
        .map(|c| c.chars().filter(|ch| !ch.is_whitespace()).collect())
        .collect();
    if let Some(index) = (1..squeezed.len()).find(|&i| squeezed[..i].contains(&squeezed[i])) {
        return Err(Rejection::Duplicate { index });
    }
    Ok(candidates)
}

/// The caller's answer when shown a set of candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryChoice {
    /// Zero-based index into the candidates.
    Select(usize),
    Regenerate,
    Quit,
}

/// Presents candidates to whoever picks one (a person at a terminal, or a script).
pub trait SummaryChooser {
    fn choose(&mut self, candidates: &[String]) -> SummaryChoice;

    /// Called when a choice was out of range. Default does nothing.
    fn rejected(&mut self, _choice: SummaryChoice) {}
}

/// Result of [`SummaryNegotiator::select_summary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    Selected(String),
    /// Every attempt came back empty.
    Exhausted,
    /// The chooser asked to quit.
    Aborted,
}

/// Generates, validates and offers summary candidates.
pub struct SummaryNegotiator {
    generator: Arc<dyn TextGenerator>,
    select_attempts: usize,
    generation_attempts: usize,
    backoff: Duration,
}

impl SummaryNegotiator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            select_attempts: DEFAULT_SELECT_ATTEMPTS,
            generation_attempts: DEFAULT_GENERATION_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }

    pub fn with_select_attempts(mut self, attempts: usize) -> Self {
        self.select_attempts = attempts.max(1);
        self
    }

    pub fn with_generation_attempts(mut self, attempts: usize) -> Self {
        self.generation_attempts = attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Build the request that asks for three numbered candidates.
    pub fn candidate_request(base_prompt: &str) -> GenerationRequest {
        GenerationRequest::new(
            Purpose::Summary,
            PLANNER_SYSTEM_PROMPT,
            format!("{base_prompt}{CANDIDATE_INSTRUCTIONS}"),
            Sampling::SUMMARY,
        )
    }

    /// Produce three valid candidates, or an empty list.
    ///
    /// A batch that is short or has any out-of-window candidate is discarded
    /// whole and requested again, up to the generation attempt limit. A
    /// service error ends the call immediately with an empty list.
    pub async fn generate_candidates(&self, base_prompt: &str) -> Vec<String> {
        for attempt in 1..=self.generation_attempts {
            let response = match self
                .generator
                .generate(Self::candidate_request(base_prompt))
                .await
            {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "summary generation failed");
                    return Vec::new();
                }
            };

            match validate_candidates(parse_candidates(&response)) {
                Ok(candidates) => {
                    tracing::info!(attempt, "summary candidates accepted");
                    return candidates;
                }
                Err(rejection) => {
                    tracing::warn!(?rejection, attempt, "summary candidates rejected");
                }
            }
        }

        tracing::warn!(
            attempts = self.generation_attempts,
            "no valid summary candidates after all attempts"
        );
        Vec::new()
    }

    /// Negotiate a summary with `chooser`.
    ///
    /// Empty rounds count against the attempt budget and are followed by the
    /// backoff pause. Regeneration requests and out-of-range choices do not.
    pub async fn select_summary(
        &self,
        base_prompt: &str,
        chooser: &mut dyn SummaryChooser,
    ) -> SelectOutcome {
        let mut failures = 0;

        loop {
            let candidates = self.generate_candidates(base_prompt).await;

            if candidates.is_empty() {
                failures += 1;
                if failures >= self.select_attempts {
                    tracing::warn!(failures, "giving up on summary generation");
                    return SelectOutcome::Exhausted;
                }
                tokio::time::sleep(self.backoff).await;
                continue;
            }

            loop {
                match chooser.choose(&candidates) {
                    SummaryChoice::Select(index) if index < candidates.len() => {
                        return SelectOutcome::Selected(candidates[index].clone());
                    }
                    SummaryChoice::Regenerate => break,
                    SummaryChoice::Quit => return SelectOutcome::Aborted,
                    invalid => chooser.rejected(invalid),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(n: usize) -> String {
        "字".repeat(n)
    }

    #[test]
    fn test_length_window_boundaries() {
        assert!(!is_valid_length(&chars(39)));
        assert!(is_valid_length(&chars(40)));
        assert!(is_valid_length(&chars(60)));
        assert!(!is_valid_length(&chars(61)));
    }

    #[test]
    fn test_whitespace_does_not_count() {
        let spaced = format!("{} {}\n{}", chars(20), chars(10), chars(10));
        assert_eq!(count_chars(&spaced), 40);
    }

    #[test]
    fn test_parse_numbered_lines() {
        let text = "1. first idea\n2、second idea\n3．third idea";
        assert_eq!(
            parse_candidates(text),
            vec!["first idea", "second idea", "third idea"]
        );
    }

    #[test]
    fn test_parse_joins_continuation_lines() {
        let text = "Here are three:\n\n1. A rabbit\nfinds a drum\n\n2. A deer\n3. A squirrel";
        assert_eq!(
            parse_candidates(text),
            vec!["A rabbit finds a drum", "A deer", "A squirrel"]
        );
    }

    #[test]
    fn test_parse_ignores_multi_digit_and_unseparated_numbers() {
        let text = "1. one\n10. still one\n2 apples\n2. two";
        assert_eq!(parse_candidates(text), vec!["one 10. still one 2 apples", "two"]);
    }

    #[test]
    fn test_validate_keeps_first_three() {
        let batch = vec![chars(45), chars(50), chars(55), chars(5)];
        let valid = validate_candidates(batch).unwrap();
        assert_eq!(valid.len(), 3);
    }

    #[test]
    fn test_validate_rejects_short_batch() {
        assert_eq!(
            validate_candidates(vec![chars(45), chars(45)]),
            Err(Rejection::TooFew { found: 2 })
        );
    }

    #[test]
    fn test_validate_rejects_any_bad_length() {
        assert_eq!(
            validate_candidates(vec![chars(45), chars(61), chars(45)]),
            Err(Rejection::BadLength { index: 1, chars: 61 })
        );
    }

    #[test]
    fn test_validate_rejects_repeated_candidate() {
        let spaced = format!("{} {}", chars(20), chars(25));
        assert_eq!(
            validate_candidates(vec![chars(45), chars(50), spaced]),
            Err(Rejection::Duplicate { index: 2 })
        );
        assert!(validate_candidates(vec![chars(45), chars(46), chars(47)]).is_ok());
    }

    #[test]
    fn test_candidate_request() {
        let request = SummaryNegotiator::candidate_request("BASE");
        assert_eq!(request.purpose, Purpose::Summary);
        assert_eq!(request.sampling, Sampling::SUMMARY);
        assert!(request.user_prompt().starts_with("BASE\n"));
        assert!(request.user_prompt().contains("1. 2. 3."));
    }
}
