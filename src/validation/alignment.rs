/*!
 * Scene-to-segment alignment repair.
 *
 * Each generated scene must resolve to exactly one originating segment.
 * Models usually echo the segment ids they were given, but not always:
 * ids get dropped, hallucinated, or duplicated. Rather than discarding
 * unmatched output, alignment falls back to pairing the Nth scene with the
 * Nth segment of the same call.
 */

use std::collections::HashSet;

use log::warn;

use crate::jobs::models::Scene;
use crate::segments::Segment;

/// Realign scenes against the segments that produced them.
///
/// A scene keeps its `segment_id` only if it matches one of the given
/// segments and no earlier scene has already claimed it; otherwise the
/// scene is assigned the id of the segment at its positional index.
/// Scenes beyond the segment count have no positional partner and are
/// dropped.
pub fn align_scenes(mut scenes: Vec<Scene>, segments: &[Segment]) -> Vec<Scene> {
    let known_ids: HashSet<&str> = segments.iter().map(|s| s.id.as_str()).collect();
    let mut claimed: HashSet<String> = HashSet::new();

    if scenes.len() > segments.len() {
        warn!(
            "Model produced {} scenes for {} segments, dropping the excess",
            scenes.len(),
            segments.len()
        );
        scenes.truncate(segments.len());
    }

    for (index, scene) in scenes.iter_mut().enumerate() {
        let keeps_id = !scene.segment_id.is_empty()
            && known_ids.contains(scene.segment_id.as_str())
            && !claimed.contains(&scene.segment_id);

        if !keeps_id {
            // Positional fallback: pair with the segment at the same index.
            if let Some(segment) = segments.get(index) {
                scene.segment_id = segment.id.clone();
            }
        }
        claimed.insert(scene.segment_id.clone());
    }

    scenes
}
