/*!
 * Typed shape validation for stage artifacts.
 *
 * Each stage's expected output is a tagged struct with explicit optional
 * fields and defaulting logic, never an untyped map. Model output is
 * expected to be imperfect, so validation collects every violation before
 * failing - diagnosability matters more than fail-fast brevity - and reads
 * the common field-name spellings the models actually emit.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::errors::ValidationError;
use crate::jobs::models::{
    CharacterBible, CharacterProfile, CharacterVariant, Feasibility, PromptSnippet, Scene,
};

/// Default camera directive for scenes that omit one
pub const DEFAULT_CAMERA: &str = "Medium Shot";

/// Word cap applied to prompt snippets
pub const SNIPPET_WORD_LIMIT: usize = 60;

/// The `Character <Letter>` identifier convention
static CHARACTER_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Character [A-Z]$").unwrap_or_else(|e| panic!("invalid character id regex: {e}"))
});

/// Build a character bible from normalized payload elements.
///
/// Characters missing an identifier are repaired by assigning the next
/// unused `Character <Letter>` id; duplicate conventional ids are a
/// violation because snippet and scene stages key on them.
pub fn character_bible_from_values(items: Vec<Value>) -> Result<CharacterBible, ValidationError> {
    let mut violations = Vec::new();
    let mut characters: Vec<CharacterProfile> = Vec::new();

    for (index, item) in items.into_iter().enumerate() {
        let Some(map) = item.as_object() else {
            violations.push(format!("character {}: not an object", index));
            continue;
        };

        let description = get_str(map, &["description", "desc", "summary"]);
        if description.is_none() {
            violations.push(format!(
                "character {}: missing required field `description`",
                index
            ));
        }

        let id = match get_str(map, &["id", "character_id", "characterId"]) {
            Some(id) => id,
            None => next_character_id(&characters),
        };

        if CHARACTER_ID.is_match(&id) && characters.iter().any(|c| c.id == id) {
            violations.push(format!("character {}: duplicate identifier `{}`", index, id));
        }

        let name = get_str(map, &["name"]).unwrap_or_else(|| id.clone());
        let variants = variants_from_value(map.get("variants"));

        characters.push(CharacterProfile {
            name,
            description: description.unwrap_or_default(),
            appearance: get_str(map, &["appearance", "looks"]),
            attire: get_str(map, &["attire", "clothing", "outfit"]),
            variants,
            id,
        });
    }

    if violations.is_empty() {
        Ok(CharacterBible { characters })
    } else {
        Err(ValidationError::schema(violations))
    }
}

fn variants_from_value(value: Option<&Value>) -> Vec<CharacterVariant> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let map = item.as_object()?;
            Some(CharacterVariant {
                context: get_str(map, &["context", "when"]).unwrap_or_else(|| "default".to_string()),
                features: get_str_list(map, &["features", "deltas", "changes"]),
            })
        })
        .collect()
}

fn next_character_id(existing: &[CharacterProfile]) -> String {
    for letter in 'A'..='Z' {
        let candidate = format!("Character {}", letter);
        if !existing.iter().any(|c| c.id == candidate) {
            return candidate;
        }
    }
    format!("Character {}", existing.len() + 1)
}

/// Build prompt snippets from normalized payload elements, resolving each
/// against the bible consumed earlier in the same job.
///
/// Over-long snippet text is truncated to the word cap, not rejected.
pub fn snippets_from_values(
    items: Vec<Value>,
    bible: &CharacterBible,
) -> Result<Vec<PromptSnippet>, ValidationError> {
    let mut violations = Vec::new();
    let mut snippets = Vec::new();

    for (index, item) in items.into_iter().enumerate() {
        let Some(map) = item.as_object() else {
            violations.push(format!("snippet {}: not an object", index));
            continue;
        };

        let character_id = get_str(map, &["character_id", "characterId", "character", "id"]);
        let text = get_str(map, &["text", "snippet", "prompt", "description"]);

        match (&character_id, &text) {
            (None, _) => {
                violations.push(format!(
                    "snippet {}: missing required field `character_id`",
                    index
                ));
            }
            (Some(id), _) if !bible.contains_id(id) => {
                violations.push(format!(
                    "snippet {}: character `{}` not present in the character bible",
                    index, id
                ));
            }
            (_, None) => {
                violations.push(format!("snippet {}: missing required field `text`", index));
            }
            (Some(id), Some(text)) => {
                snippets.push(PromptSnippet {
                    character_id: id.clone(),
                    text: truncate_words(text, SNIPPET_WORD_LIMIT),
                });
            }
        }
    }

    if violations.is_empty() {
        Ok(snippets)
    } else {
        Err(ValidationError::schema(violations))
    }
}

/// Build scenes from normalized payload elements.
///
/// `segment_id` is left as the model produced it (possibly empty); the
/// alignment pass owns repairing it. Missing optional fields receive
/// explicit defaults.
pub fn scenes_from_values(items: Vec<Value>) -> Result<Vec<Scene>, ValidationError> {
    let mut violations = Vec::new();
    let mut scenes = Vec::new();

    for (index, item) in items.into_iter().enumerate() {
        let Some(map) = item.as_object() else {
            violations.push(format!("scene {}: not an object", index));
            continue;
        };

        let description = get_str(map, &["description", "desc", "scene"]);
        let image_prompt = get_str(map, &["image_prompt", "imagePrompt"]);
        let video_prompt = get_str(map, &["video_prompt", "videoPrompt"]);

        let mut element_violations = Vec::new();
        for (field, value) in [
            ("description", &description),
            ("image_prompt", &image_prompt),
            ("video_prompt", &video_prompt),
        ] {
            if value.is_none() {
                element_violations.push(format!(
                    "scene {}: missing required field `{}`",
                    index, field
                ));
            }
        }

        if !element_violations.is_empty() {
            violations.extend(element_violations);
            continue;
        }

        let feasibility = get_str(map, &["feasibility", "feasibilityLevel", "feasibility_level"])
            .and_then(|s| s.parse::<Feasibility>().ok())
            .unwrap_or_default();

        scenes.push(Scene {
            segment_id: get_str(map, &["segment_id", "segmentId"]).unwrap_or_default(),
            description: description.unwrap_or_default(),
            camera: get_str(map, &["camera", "camera_shot", "cameraShot"])
                .unwrap_or_else(|| DEFAULT_CAMERA.to_string()),
            visual_style: get_str(map, &["visual_style", "visualStyle", "style"]),
            audio_cue: get_str(map, &["audio_cue", "audioCue", "audio"]),
            image_prompt: image_prompt.unwrap_or_default(),
            video_prompt: video_prompt.unwrap_or_default(),
            feasibility,
            tags: get_str_list(map, &["tags", "metadata_tags", "labels"]),
        });
    }

    if violations.is_empty() {
        Ok(scenes)
    } else {
        Err(ValidationError::schema(violations))
    }
}

/// First non-empty string under any of the given keys
fn get_str(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        map.get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// String list under any of the given keys; scalar strings become a
/// singleton list
fn get_str_list(map: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    for key in keys {
        match map.get(*key) {
            Some(Value::Array(items)) => {
                return items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect();
            }
            Some(Value::String(s)) if !s.trim().is_empty() => {
                return vec![s.trim().to_string()];
            }
            _ => continue,
        }
    }
    Vec::new()
}

/// Truncate text to at most `limit` whitespace-separated words
fn truncate_words(text: &str, limit: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= limit {
        text.trim().to_string()
    } else {
        words[..limit].join(" ")
    }
}
