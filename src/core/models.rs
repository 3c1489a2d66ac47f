use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/*
 * This module defines the shared data model of the search core: scopes,
 * queries, result batches, file-change events, and the marker-strip types.
 * Everything here is plain data; behavior lives in the components that
 * produce or consume these values.
 */

// The set of documents a search operates over. Resolving a scope never
// mutates it; it is a pure selector consumed by the ScopeResolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchScope {
    CurrentFolder,
    OpenFiles,
    EntireWorkspace,
}

impl Default for SearchScope {
    fn default() -> Self {
        SearchScope::CurrentFolder
    }
}

/*
 * An immutable search intent. The sequence number is assigned from a shared
 * monotonically increasing counter at submission time and is the sole basis
 * for staleness comparison; wall-clock time is unreliable under fast
 * retyping.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub raw: String,
    pub scope: SearchScope,
    pub sequence: u64,
}

impl SearchQuery {
    pub fn new(raw: impl Into<String>, scope: SearchScope, sequence: u64) -> Self {
        SearchQuery {
            raw: raw.into(),
            scope,
            sequence,
        }
    }

    // An empty or whitespace-only query clears the panel instead of scanning.
    pub fn is_cleared(&self) -> bool {
        self.raw.trim().is_empty()
    }
}

// A document currently open in a tab. Two tabs may reference the same path;
// search treats them as one underlying document, deduplicated by normalized
// path at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenDocument {
    pub path: PathBuf,
    pub display_name: String,
}

impl OpenDocument {
    pub fn new(path: PathBuf, display_name: impl Into<String>) -> Self {
        OpenDocument {
            path,
            display_name: display_name.into(),
        }
    }
}

/*
 * One row of the result list. A document contributes up to the configured
 * number of preview rows, each carrying the document-level match count.
 * Serialized as-is for the UI layer.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub path: PathBuf,
    pub display_name: String,
    /* 1-based line number of the previewed match. */
    pub line_number: usize,
    /* Total number of matches within this document. */
    pub match_count: usize,
    pub preview: String,
}

/*
 * The joined output of one scan. Tagged with the sequence number of the
 * query that produced it; consumers must discard any batch whose sequence
 * is lower than the last applied one. `skipped_documents` counts files that
 * failed to open or read and were silently excluded.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResultBatch {
    pub sequence: u64,
    pub results: Vec<SearchResult>,
    pub skipped_documents: usize,
}

impl SearchResultBatch {
    pub fn empty(sequence: u64) -> Self {
        SearchResultBatch {
            sequence,
            results: Vec::new(),
            skipped_documents: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

// The logical kind of a coalesced file-system change. `Renamed` keeps the
// previous path so consumers can evict state keyed by it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Renamed { old_path: PathBuf },
    Deleted,
}

impl ChangeKind {
    /*
     * Severity rank used when coalescing a burst of raw notifications for
     * one path: Deleted dominates Renamed dominates Modified dominates
     * Created. A rename changes scope membership, so it outranks a plain
     * content modification.
     */
    fn severity(&self) -> u8 {
        match self {
            ChangeKind::Created => 0,
            ChangeKind::Modified => 1,
            ChangeKind::Renamed { .. } => 2,
            ChangeKind::Deleted => 3,
        }
    }

    pub fn dominant(self, other: ChangeKind) -> ChangeKind {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

/*
 * A coalesced, logical file-change notification. Ephemeral: consumed once by
 * the coordinator, then discarded. `watcher_id` identifies the originating
 * watch registration.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub watcher_id: u64,
}

// Marker-strip entry types. Serialized for the UI layer, which paints them
// onto the normalized position indicator next to the scrollbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MarkerKind {
    Heading,
    SearchMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrollbarMarker {
    pub id: u64,
    /* Normalized position within the document, clamped to [0, 1]. */
    pub position: f64,
    pub kind: MarkerKind,
    pub tooltip: String,
}

// A heading element's position within a rendered document, supplied by the
// external renderer. `offset` is measured from the top of the content.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadingPosition {
    pub level: u8,
    pub text: String,
    pub offset: f64,
}

/*
 * The resolution context for a search: the active folder, every connected
 * workspace root (local folder plus remote mirrors), and the set of
 * documents currently open across all tabs. Owned by the facade, updated by
 * the external tab/window layer, and read by the ScopeResolver.
 */
#[derive(Debug, Clone, Default)]
pub struct WorkspaceContext {
    pub active_folder: Option<PathBuf>,
    pub workspace_roots: Vec<PathBuf>,
    pub open_documents: Vec<OpenDocument>,
}

impl WorkspaceContext {
    /*
     * All roots relevant to `EntireWorkspace`: the active folder followed by
     * every connected root, without duplicates.
     */
    pub fn all_roots(&self) -> Vec<PathBuf> {
        let mut roots = Vec::new();
        if let Some(active) = &self.active_folder {
            roots.push(active.clone());
        }
        for root in &self.workspace_roots {
            if !roots.contains(root) {
                roots.push(root.clone());
            }
        }
        roots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_change_kind_dominance_order() {
        let renamed = ChangeKind::Renamed {
            old_path: PathBuf::from("/tmp/old.md"),
        };

        assert_eq!(
            ChangeKind::Created.dominant(ChangeKind::Modified),
            ChangeKind::Modified
        );
        assert_eq!(
            ChangeKind::Modified.dominant(ChangeKind::Deleted),
            ChangeKind::Deleted
        );
        assert_eq!(
            ChangeKind::Deleted.dominant(ChangeKind::Created),
            ChangeKind::Deleted
        );
        assert_eq!(renamed.clone().dominant(ChangeKind::Modified), renamed);
        assert_eq!(
            renamed.clone().dominant(ChangeKind::Deleted),
            ChangeKind::Deleted
        );
    }

    #[test]
    fn test_dominance_keeps_first_on_equal_severity() {
        let first = ChangeKind::Renamed {
            old_path: PathBuf::from("/tmp/a.md"),
        };
        let second = ChangeKind::Renamed {
            old_path: PathBuf::from("/tmp/b.md"),
        };
        // Equal severity keeps the already-buffered kind.
        assert_eq!(first.clone().dominant(second), first);
    }

    #[test]
    fn test_query_cleared_detection() {
        let cleared = SearchQuery::new("   \t", SearchScope::CurrentFolder, 1);
        let live = SearchQuery::new("hello", SearchScope::OpenFiles, 2);
        assert!(cleared.is_cleared());
        assert!(!live.is_cleared());
    }

    #[test]
    fn test_workspace_context_all_roots_dedups() {
        let ctx = WorkspaceContext {
            active_folder: Some(PathBuf::from("/notes")),
            workspace_roots: vec![PathBuf::from("/notes"), PathBuf::from("/remote/mirror")],
            open_documents: Vec::new(),
        };
        assert_eq!(
            ctx.all_roots(),
            vec![PathBuf::from("/notes"), PathBuf::from("/remote/mirror")]
        );
    }

    #[test]
    fn test_default_scope_is_current_folder() {
        assert_eq!(SearchScope::default(), SearchScope::CurrentFolder);
    }
}
