/*!
 * Stage prompt construction.
 *
 * Each stage prompt embeds the prior stage's validated artifact as JSON so
 * the model sees exactly the structure the validator produced, not a
 * paraphrase of it.
 */

use crate::jobs::models::{CharacterBible, PromptSnippet};
use crate::segments::Segment;

/// Prompt for the character extraction stage
pub fn character_prompt(segments: &[Segment]) -> String {
    format!(
        "Input segments:\n{}\n\nExtract every distinct character appearing in these segments.",
        render_segments(segments)
    )
}

/// Prompt for the snippet synthesis stage
pub fn snippet_prompt(bible: &CharacterBible) -> String {
    format!(
        "Character bible:\n{}\n\nWrite one visual descriptor per character.",
        to_json(bible)
    )
}

/// Prompt for one scene-generation batch
pub fn scene_prompt(
    bible: &CharacterBible,
    snippets: &[PromptSnippet],
    batch: &[Segment],
) -> String {
    format!(
        "Character bible:\n{}\n\nCharacter snippets:\n{}\n\nInput segments for this batch:\n{}\n\n\
         Produce exactly one scene per input segment, in order, echoing each segment's id.",
        to_json(bible),
        to_json(&snippets),
        render_segments(batch)
    )
}

fn render_segments(segments: &[Segment]) -> String {
    to_json(&segments)
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}
