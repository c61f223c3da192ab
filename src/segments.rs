/*!
 * Input segmentation.
 *
 * A segment is one atomic input unit (one sentence or voice line) with a
 * stable identifier. The parser is deliberately forgiving about the input
 * shape: submitters hand us JSON arrays, wrapper objects, single objects, or
 * plain text, and all of them become the same segment list.
 */

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One atomic input unit consumed read-only by the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Stable identifier, unique within a job
    pub id: String,

    /// The text to visualize
    pub text: String,
}

impl Segment {
    /// Create a new segment
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Parser turning raw submission payloads into segment lists
pub struct SegmentParser;

impl SegmentParser {
    /// Parse a raw input payload into segments.
    ///
    /// Accepted forms:
    /// - a JSON array of segment objects or strings
    /// - a `{"segments": [...]}` wrapper object
    /// - a single JSON object
    /// - newline-delimited plain text (line N becomes id `seg-N`)
    ///
    /// Blank lines and empty elements are skipped. Objects without an
    /// explicit id get a positional one.
    pub fn parse(raw: &str) -> Vec<Segment> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }

        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
                return Self::from_value(value);
            }
        }

        Self::from_plain_text(trimmed)
    }

    fn from_value(value: Value) -> Vec<Segment> {
        match value {
            Value::Array(items) => Self::from_items(items),
            Value::Object(map) => {
                if let Some(Value::Array(items)) = map.get("segments") {
                    Self::from_items(items.clone())
                } else {
                    Self::from_items(vec![Value::Object(map)])
                }
            }
            _ => Vec::new(),
        }
    }

    fn from_items(items: Vec<Value>) -> Vec<Segment> {
        items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| Self::segment_from_value(item, index))
            .collect()
    }

    fn segment_from_value(value: Value, index: usize) -> Option<Segment> {
        match value {
            Value::String(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    return None;
                }
                Some(Segment::new(positional_id(index), text))
            }
            Value::Object(map) => {
                let text = map
                    .get("text")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .unwrap_or_default()
                    .to_string();
                if text.is_empty() {
                    return None;
                }
                let id = match map.get("id") {
                    Some(Value::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
                    Some(Value::Number(n)) => format!("seg-{}", n),
                    _ => positional_id(index),
                };
                Some(Segment::new(id, text))
            }
            _ => None,
        }
    }

    fn from_plain_text(raw: &str) -> Vec<Segment> {
        raw.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(index, line)| Segment::new(positional_id(index), line))
            .collect()
    }
}

fn positional_id(index: usize) -> String {
    format!("seg-{}", index + 1)
}
