//! Tour-guide prompt template.

use crate::providers::PointOfInterest;

/// Category used when the provider reports no primary type.
pub const DEFAULT_CATEGORY: &str = "Tourist Attraction";

/// Target narration length in words.
pub const TARGET_WORDS: usize = 100;

/// Builds the single prompt sent to the text generator for one point of interest.
pub fn build_tour_prompt(poi: &PointOfInterest) -> String {
    let category = poi
        .primary_category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CATEGORY);
    let categories = poi.categories.join(", ");

    format!(
        "You are an enthusiastic, knowledgeable tour guide giving live commentary to someone \
travelling past a landmark right now.\n\
\n\
Guidelines:\n\
- Speak directly to the listener in the second person and the present tense\n\
- Share history, context and a fun fact or two\n\
- Keep it conversational and engaging, like a personal guide riding along\n\
- Mention what is to the left or right when it helps\n\
- Focus on this specific place\n\
- Write a single paragraph of about {words} words, no lists or headings\n\
\n\
Place:\n\
- Name: {name}\n\
- Address: {address}\n\
- Type: {category}\n\
- Categories: {categories}\n\
\n\
Give the commentary now, as if the listener is passing by this very moment.",
        words = TARGET_WORDS,
        name = poi.name,
        address = poi.address,
        category = category,
        categories = categories,
    )
}
