/*!
 * Unit tests for the segment parser's accepted input forms.
 */

use sceneforge::segments::{Segment, SegmentParser};

#[test]
fn test_parse_jsonArrayForm_shouldProduceSegments() {
    let raw = r#"[
        {"id": "intro", "text": "A city at night."},
        {"id": "beat-2", "text": "Rain starts to fall."}
    ]"#;

    let segments = SegmentParser::parse(raw);

    assert_eq!(
        segments,
        vec![
            Segment::new("intro", "A city at night."),
            Segment::new("beat-2", "Rain starts to fall."),
        ]
    );
}

#[test]
fn test_parse_wrapperForm_shouldProduceSegments() {
    let raw = r#"{"segments": [{"id": "a", "text": "One"}]}"#;

    let segments = SegmentParser::parse(raw);

    assert_eq!(segments, vec![Segment::new("a", "One")]);
}

#[test]
fn test_parse_singleObjectForm_shouldProduceOneSegment() {
    let raw = r#"{"id": "solo", "text": "The only line."}"#;

    let segments = SegmentParser::parse(raw);

    assert_eq!(segments, vec![Segment::new("solo", "The only line.")]);
}

#[test]
fn test_parse_plainTextForm_shouldProduceOneSegmentPerLine() {
    let raw = "The door creaks open.\nA shadow crosses the wall.\n";

    let segments = SegmentParser::parse(raw);

    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].id, "seg-1");
    assert_eq!(segments[1].id, "seg-2");
    assert_eq!(segments[1].text, "A shadow crosses the wall.");
}

#[test]
fn test_parse_objectsWithoutText_shouldBeSkipped() {
    let raw = r#"[{"id": "a", "text": "kept"}, {"id": "b"}, {"id": "c", "text": ""}]"#;

    let segments = SegmentParser::parse(raw);

    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].id, "a");
}

#[test]
fn test_parse_idsAreStableAcrossReparses() {
    let raw = "line one\nline two\nline three";

    let first = SegmentParser::parse(raw);
    let second = SegmentParser::parse(raw);

    assert_eq!(first, second);
}
