/*
 * This module consolidates the core logic of the search subsystem. It
 * re-exports the key data structures and abstractions (such as
 * `ScopeResolverOperations`, `DocumentAccessOperations`,
 * `ConfigManagerOperations`, and the `SearchEventSink` notification surface)
 * for scope resolution, document scanning, live change detection, search
 * coordination, marker projection, and presentation state.
 */
pub mod config;
pub mod document_access;
pub mod document_scanner;
pub mod folder_watcher;
pub mod marker_projector;
pub mod models;
pub mod path_utils;
pub mod presentation_state;
pub mod query_debounce;
pub mod scope_resolver;
pub mod search_coordinator;

// Re-export key structures and enums
pub use models::{
    ChangeEvent, ChangeKind, HeadingPosition, MarkerKind, OpenDocument, ScrollbarMarker,
    SearchQuery, SearchResult, SearchResultBatch, SearchScope, WorkspaceContext,
};

// Re-export scope resolution related items
pub use scope_resolver::{CoreScopeResolver, ScopeResolverOperations};

// Re-export document access related items
pub use document_access::{CoreDocumentAccess, DocumentAccessError, DocumentAccessOperations};

// Re-export watcher related items
pub use folder_watcher::{FolderWatcher, WatchError, WatchEvent, WatchHandle};

// Re-export coordinator related items
pub use search_coordinator::{SearchCoordinator, SearchEventSink};

// Re-export presentation related items
pub use presentation_state::{PresentationGuard, PresentationState};

// Re-export config related items
pub use config::{ConfigManagerOperations, CoreConfigManager, SearchTuning};

#[cfg(test)]
pub use config::ConfigError;

pub use marker_projector::project_markers;
