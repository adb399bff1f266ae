//! Single-pass stories built from a chosen summary.

use crate::generator::{GenerationRequest, Purpose, Sampling, TextGenerator};

const STORY_SYSTEM_PROMPT: &str = "You are a gentle children's story writer.";

/// Prompt for a standalone story: the base prompt plus the chosen summary.
pub fn story_prompt(base_prompt: &str, summary: &str) -> String {
    format!("{base_prompt}\nDevelop the story from the following summary:\n{summary}")
}

/// Generate a complete standalone story. Service failures are logged and yield `None`.
pub async fn generate_standalone(
    generator: &dyn TextGenerator,
    base_prompt: &str,
    summary: &str,
) -> Option<String> {
    let request = GenerationRequest::new(
        Purpose::Story,
        STORY_SYSTEM_PROMPT,
        story_prompt(base_prompt, summary),
        Sampling::NARRATIVE,
    );

    match generator.generate(request).await {
        Ok(story) => Some(story),
        Err(e) => {
            tracing::warn!(error = %e, "standalone story generation failed");
            None
        }
    }
}
