/*!
 * Structural extraction of JSON payloads from raw model text.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::errors::ValidationError;

/// Matches an opening or closing markdown code fence, with optional language tag
static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*```[a-zA-Z]*\s*$").unwrap_or_else(|e| panic!("invalid fence regex: {e}"))
});

/// Length of the diagnostic fragment carried by parse errors
const FRAGMENT_LEN: usize = 80;

/// Extract the JSON payload embedded in a raw model response.
///
/// Strips markdown code fences, slices to the outermost structural span
/// (tolerating leading and trailing commentary), and parses the result.
pub fn extract_payload(raw: &str) -> Result<Value, ValidationError> {
    let stripped = strip_code_fences(raw);
    let sliced = slice_structural_span(&stripped)?;

    serde_json::from_str(sliced)
        .map_err(|e| ValidationError::Parse(format!("{} in: {}", e, fragment(sliced))))
}

/// Remove markdown code-fence marker lines, keeping their content
fn strip_code_fences(raw: &str) -> String {
    CODE_FENCE.replace_all(raw, "").into_owned()
}

/// Slice to the span from the first top-level `{` or `[` to the matching
/// last `}` or `]`.
///
/// If a brace appears before a bracket the payload is treated as an object,
/// otherwise as an array.
fn slice_structural_span(text: &str) -> Result<&str, ValidationError> {
    let first_brace = text.find('{');
    let first_bracket = text.find('[');

    let (open, close_char) = match (first_brace, first_bracket) {
        (Some(brace), Some(bracket)) if brace < bracket => (brace, '}'),
        (Some(brace), None) => (brace, '}'),
        (_, Some(bracket)) => (bracket, ']'),
        (None, None) => {
            return Err(ValidationError::Parse(format!(
                "no JSON object or array found in: {}",
                fragment(text)
            )));
        }
    };

    let close = text.rfind(close_char).filter(|&close| close > open).ok_or_else(|| {
        ValidationError::Parse(format!(
            "unterminated JSON payload in: {}",
            fragment(text)
        ))
    })?;

    Ok(&text[open..=close])
}

/// Coerce a parsed payload into a list of elements.
///
/// An array is its own elements. An object is searched for its first
/// array-valued property (well-known wrapper keys first, then anything);
/// an object wrapping nothing array-like becomes a singleton list.
pub fn normalize_to_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(map) => {
            for key in ["characters", "snippets", "scenes", "segments", "data", "items"] {
                if let Some(Value::Array(items)) = map.get(key) {
                    return items.clone();
                }
            }
            if let Some(Value::Array(items)) = map.values().find(|v| v.is_array()) {
                return items.clone();
            }
            vec![Value::Object(map)]
        }
        other => vec![other],
    }
}

/// Short fragment of the offending text for diagnostics
fn fragment(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= FRAGMENT_LEN {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(FRAGMENT_LEN).collect();
        format!("{}...", head)
    }
}
