use crate::core::models::{HeadingPosition, MarkerKind, ScrollbarMarker};
use std::collections::HashSet;

/*
 * Derives the marker-strip content for one document view: heading markers
 * from the renderer-supplied heading positions, and search-match markers
 * from a case-insensitive literal pass over the flattened rendered text.
 * The combined set is deduplicated by (kind, position rounded to 4 decimal
 * places) and sorted ascending by position.
 *
 * Match positions are derived from flattened text offsets, not true rendered
 * pixel offsets. The markers are navigational hints, so that approximation
 * is accepted; no pixel mapping is attempted.
 *
 * Marker sets are recomputed wholesale on every underlying change (content
 * or query) and replace the prior set atomically; nothing here patches
 * incrementally.
 */
pub fn project_markers(
    headings: &[HeadingPosition],
    rendered_text: &str,
    query: &str,
    content_height: f64,
) -> Vec<ScrollbarMarker> {
    // A not-yet-measured layout has no meaningful positions to project.
    if content_height <= 0.0 {
        return Vec::new();
    }

    let mut markers = Vec::new();

    for heading in headings {
        let text = heading.text.trim();
        let label = if text.is_empty() { "Heading" } else { text };
        markers.push(ScrollbarMarker {
            id: 0,
            position: clamp_unit(heading.offset / content_height),
            kind: MarkerKind::Heading,
            tooltip: format!("H{}: {label}", heading.level),
        });
    }

    append_search_markers(&mut markers, rendered_text, query);

    // Dedup by (kind, position rounded to 4 decimals), keeping the first
    // occurrence: a heading line that also matches the query would otherwise
    // double-paint the same strip location.
    let mut seen: HashSet<(MarkerKind, i64)> = HashSet::new();
    markers.retain(|marker| seen.insert((marker.kind, round4_key(marker.position))));

    markers.sort_by(|a, b| a.position.total_cmp(&b.position));
    for (index, marker) in markers.iter_mut().enumerate() {
        marker.id = index as u64 + 1;
    }
    markers
}

/*
 * Appends one marker per case-insensitive literal match of `query` in the
 * flattened `rendered_text`. The cursor advances past each match, so matches
 * never overlap. Positions divide the match's start offset by the total text
 * length.
 */
fn append_search_markers(markers: &mut Vec<ScrollbarMarker>, rendered_text: &str, query: &str) {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return;
    }
    let haystack = rendered_text.to_lowercase();
    let total_len = haystack.len();
    if total_len == 0 {
        return;
    }

    let trimmed_query = query.trim();
    let mut cursor = 0;
    let mut ordinal = 0;
    while let Some(found) = haystack[cursor..].find(&needle) {
        let start = cursor + found;
        ordinal += 1;
        markers.push(ScrollbarMarker {
            id: 0,
            position: clamp_unit(start as f64 / total_len as f64),
            kind: MarkerKind::SearchMatch,
            tooltip: format!("Match {ordinal}: \"{trimmed_query}\""),
        });
        cursor = start + needle.len();
    }
}

fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

fn round4_key(position: f64) -> i64 {
    (position * 10_000.0).round() as i64
}
