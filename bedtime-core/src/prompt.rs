//! Base narrative prompt shared by every generation request.

use crate::age;
use crate::setting::Setting;

/// Language requested when none is configured.
pub const DEFAULT_LANGUAGE: &str = "Chinese";

/// Builds the base prompt from the child's age and the story inputs.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    language: String,
}

impl PromptBuilder {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }

    /// Interpolate the age bracket and story inputs into the fixed template.
    ///
    /// The inputs are inserted verbatim; no escaping or validation happens here.
    pub fn build(&self, months: u32, character: &str, elements: &str, setting: Setting) -> String {
        let bracket = age::bracket(months);
        let (min_words, max_words) = bracket.word_range;

        format!(
            "You are a caring children's story writer. Please write a bedtime story \
             for a {age}-year-old child.\n\n\
             The main character is: {character}.\n\
             The story should include these elements: {elements}.\n\
             The story takes place in: {setting}.\n\n\
             Strictly follow these requirements:\n\
             - Keep the length between {min_words} and {max_words} words\n\
             {style}\n\
             - Keep the content positive, healthy and suitable for children\n\
             - Give the story a warm and happy ending\n\
             - Do not include horror, violence or negativity\n\
             - Write the story in {language}, in clearly separated paragraphs suitable for reading aloud\n",
            age = bracket.display_age,
            setting = setting.name(),
            style = bracket.style_notes,
            language = self.language,
        )
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE)
    }
}
