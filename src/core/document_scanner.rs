/*
 * Per-document scanning for the search pipeline. Matching is case-insensitive
 * literal substring only: no regex, no word boundaries, no ranking. The
 * scanner accumulates the total match count for a document and collects the
 * first few matching lines as previews for the result list.
 */

const PREVIEW_MAX_CHARS: usize = 120;

// A matching line collected as a preview row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPreview {
    /* 1-based line number of the matching line. */
    pub line_number: usize,
    pub text: String,
}

// Everything a single document contributes to a result batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMatches {
    pub match_count: usize,
    pub previews: Vec<MatchPreview>,
}

/*
 * Counts non-overlapping occurrences of `needle_lower` in `haystack_lower`.
 * Both inputs must already be lowercased; the cursor advances past each
 * match, so "aa" occurs twice in "aaaa".
 */
pub fn count_occurrences(haystack_lower: &str, needle_lower: &str) -> usize {
    if needle_lower.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut cursor = 0;
    while let Some(found) = haystack_lower[cursor..].find(needle_lower) {
        count += 1;
        cursor += found + needle_lower.len();
    }
    count
}

/*
 * Scans one document's text for case-insensitive literal occurrences of
 * `query`. Returns `None` when the document does not match at all; otherwise
 * the total match count plus the first `preview_cap` matching lines, in line
 * order. Previews are trimmed and truncated so the result list stays
 * bounded.
 */
pub fn scan_text(text: &str, query: &str, preview_cap: usize) -> Option<DocumentMatches> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    let mut match_count = 0;
    let mut previews = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line_lower = line.to_lowercase();
        let occurrences = count_occurrences(&line_lower, &needle);
        if occurrences == 0 {
            continue;
        }
        match_count += occurrences;
        if previews.len() < preview_cap {
            previews.push(MatchPreview {
                line_number: index + 1,
                text: preview_of(line),
            });
        }
    }

    if match_count == 0 {
        None
    } else {
        Some(DocumentMatches {
            match_count,
            previews,
        })
    }
}

fn preview_of(line: &str) -> String {
    let trimmed = line.trim();
    if trimmed.chars().count() <= PREVIEW_MAX_CHARS {
        return trimmed.to_string();
    }
    trimmed.chars().take(PREVIEW_MAX_CHARS).collect()
}
