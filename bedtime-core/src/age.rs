//! Age brackets used to pitch a story at the right level.

/// Upper bound (inclusive, in months) of the toddler bracket.
pub const TODDLER_MAX_MONTHS: u32 = 36;

/// Upper bound (inclusive, in months) of the preschool bracket.
pub const PRESCHOOL_MAX_MONTHS: u32 = 60;

/// Narrative style descriptor for a child's age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeBracket {
    /// Age in years as shown to the generator.
    pub display_age: u32,
    /// Inclusive word-count window for a story.
    pub word_range: (u32, u32),
    /// Bullet list of style requirements, one per line.
    pub style_notes: &'static str,
}

const TODDLER: AgeBracket = AgeBracket {
    display_age: 2,
    word_range: (100, 300),
    style_notes: "- Use very simple words and short sentences\n\
                  - Repeat sentence patterns with a gentle rhythm that is easy to read aloud\n\
                  - Keep the content soft and tender, with no complicated plot",
};

const PRESCHOOL: AgeBracket = AgeBracket {
    display_age: 4,
    word_range: (300, 600),
    style_notes: "- Keep the language simple and clear, with a basic plot\n\
                  - Include simple interactions between characters and clear cause and effect\n\
                  - Keep the tone gentle and the ending warm",
};

const SCHOOL: AgeBracket = AgeBracket {
    display_age: 6,
    word_range: (600, 1000),
    style_notes: "- Make the plot a little richer, with a conflict and its resolution\n\
                  - Add dialogue and expressions of feeling\n\
                  - Give the story a complete structure and a positive message",
};

/// Pick the bracket for a child of `months` months.
pub fn bracket(months: u32) -> AgeBracket {
    if months <= TODDLER_MAX_MONTHS {
        TODDLER
    } else if months <= PRESCHOOL_MAX_MONTHS {
        PRESCHOOL
    } else {
        SCHOOL
    }
}
