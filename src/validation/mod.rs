/*!
 * Defensive validation of model output.
 *
 * Model responses are loosely structured: they arrive wrapped in markdown
 * fences, surrounded by commentary, nested in wrapper objects, and with
 * fields missing or renamed. This module turns that text into the typed
 * stage artifacts the pipeline trusts, repairing what it can and
 * enumerating every violation when it cannot.
 *
 * - `parser`: fence stripping, payload slicing, JSON extraction
 * - `schema`: typed shape validation with explicit defaults
 * - `alignment`: scene-to-segment realignment with positional fallback
 */

pub mod alignment;
pub mod parser;
pub mod schema;

use crate::errors::ValidationError;
use crate::jobs::models::{CharacterBible, PromptSnippet, Scene};
use crate::segments::Segment;

/// Parse a raw character-stage response into a character bible
pub fn parse_character_bible(raw: &str) -> Result<CharacterBible, ValidationError> {
    let payload = parser::extract_payload(raw)?;
    let items = parser::normalize_to_list(payload);
    schema::character_bible_from_values(items)
}

/// Parse a raw snippet-stage response, resolving each snippet against the
/// bible consumed earlier in the same job
pub fn parse_prompt_snippets(
    raw: &str,
    bible: &CharacterBible,
) -> Result<Vec<PromptSnippet>, ValidationError> {
    let payload = parser::extract_payload(raw)?;
    let items = parser::normalize_to_list(payload);
    schema::snippets_from_values(items, bible)
}

/// Parse a raw scene-stage response and realign it against the originating
/// segments (one scene per segment, positional fallback for unmatched ids)
pub fn parse_scenes(raw: &str, segments: &[Segment]) -> Result<Vec<Scene>, ValidationError> {
    let payload = parser::extract_payload(raw)?;
    let items = parser::normalize_to_list(payload);
    let scenes = schema::scenes_from_values(items)?;
    Ok(alignment::align_scenes(scenes, segments))
}
