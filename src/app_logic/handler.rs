use crate::core::config::{ConfigManagerOperations, SearchTuning};
use crate::core::document_access::CoreDocumentAccess;
use crate::core::folder_watcher::{FolderWatcher, WatchHandle};
use crate::core::marker_projector;
use crate::core::models::{
    HeadingPosition, OpenDocument, ScrollbarMarker, SearchQuery, SearchScope, WorkspaceContext,
};
use crate::core::path_utils;
use crate::core::scope_resolver::CoreScopeResolver;
use crate::core::search_coordinator::{SearchCoordinator, SearchEventSink};
use parking_lot::{Mutex, RwLock};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/*
 * The application-facing facade of the search core. The surrounding app
 * (tabs, document rendering, window chrome) drives this type: it pushes the
 * workspace shape in (open folder, connected mirrors, open tabs), submits
 * and closes searches, and pulls marker sets for the view it is rendering.
 * All outbound information flows through the injected `SearchEventSink`.
 *
 * One instance lives per search-panel lifetime; there is no ambient global
 * state.
 */

// What the external renderer knows about one document view: heading
// positions, the flattened rendered text, and the measured content height.
#[derive(Debug, Clone, Default)]
pub struct DocumentViewSnapshot {
    pub headings: Vec<HeadingPosition>,
    pub rendered_text: String,
    pub content_height: f64,
}

pub(crate) const APP_NAME_FOR_CONFIG: &str = "MarkScout";

pub struct SearchPanelLogic {
    context: Arc<RwLock<WorkspaceContext>>,
    coordinator: SearchCoordinator,
    watcher: FolderWatcher,
    sink: Arc<dyn SearchEventSink>,
    watch_handles: Mutex<Vec<WatchHandle>>,
    current_query_text: Mutex<String>,
    current_scope: Mutex<SearchScope>,
}

impl SearchPanelLogic {
    /*
     * Wires the full core together: resolver and document access behind
     * their traits, the watcher's event stream into the coordinator, and the
     * shared workspace context between facade and coordinator.
     */
    pub fn new(tuning: SearchTuning, sink: Arc<dyn SearchEventSink>) -> Self {
        let context = Arc::new(RwLock::new(WorkspaceContext::default()));
        let resolver = Arc::new(CoreScopeResolver::new(tuning.supported_extensions.clone()));
        let access = Arc::new(CoreDocumentAccess::new());
        let mut watcher = FolderWatcher::new(Duration::from_millis(tuning.coalesce_ms));
        let mut coordinator = SearchCoordinator::new(
            tuning,
            resolver,
            access,
            Arc::clone(&context),
            Arc::clone(&sink),
        );
        if let Some(events) = watcher.take_events() {
            coordinator.attach_watch_events(events);
        }

        SearchPanelLogic {
            context,
            coordinator,
            watcher,
            sink,
            watch_handles: Mutex::new(Vec::new()),
            current_query_text: Mutex::new(String::new()),
            current_scope: Mutex::new(SearchScope::default()),
        }
    }

    /*
     * Convenience constructor that loads the persisted search tuning before
     * wiring the core together. A load failure falls back to defaults; the
     * panel must come up either way.
     */
    pub fn with_stored_tuning(
        config_manager: &dyn ConfigManagerOperations,
        sink: Arc<dyn SearchEventSink>,
    ) -> Self {
        let tuning = match config_manager.load_tuning(APP_NAME_FOR_CONFIG) {
            Ok(tuning) => tuning,
            Err(e) => {
                log::warn!("SearchPanelLogic: Failed to load search tuning: {e}. Using defaults.");
                SearchTuning::default()
            }
        };
        Self::new(tuning, sink)
    }

    /*
     * Makes `path` the active folder and subscribes it to live change
     * detection. A failed subscription is surfaced as a passive watch-error
     * notification and the folder still opens; search then only reacts to
     * explicit re-submission.
     */
    pub fn open_folder(&self, path: &Path) {
        let normalized = path_utils::normalize_document_path(path);
        self.context.write().active_folder = Some(normalized.clone());
        self.watch_root(&normalized);
    }

    // Connects a remote workspace mirror root alongside the active folder.
    pub fn connect_workspace_root(&self, path: &Path) {
        let normalized = path_utils::normalize_document_path(path);
        {
            let mut context = self.context.write();
            if !context.workspace_roots.contains(&normalized) {
                context.workspace_roots.push(normalized.clone());
            }
        }
        self.watch_root(&normalized);
    }

    pub fn disconnect_workspace_root(&self, path: &Path) {
        let normalized = path_utils::normalize_document_path(path);
        self.context
            .write()
            .workspace_roots
            .retain(|root| root != &normalized);

        let mut handles = self.watch_handles.lock();
        if let Some(index) = handles.iter().position(|h| h.root() == normalized.as_path()) {
            let handle = handles.remove(index);
            self.watcher.unwatch(&handle);
        }
    }

    /*
     * Replaces the open-document registry view. Called by the external tab
     * layer whenever tabs open, close, or change; read-only from the core's
     * perspective.
     */
    pub fn set_open_documents(&self, documents: Vec<OpenDocument>) {
        self.context.write().open_documents = documents;
    }

    /*
     * Fire-and-observe search submission. The returned query carries the
     * sequence number observers will see on the matching result batch.
     */
    pub fn submit_search(&self, raw: &str, scope: SearchScope) -> SearchQuery {
        *self.current_scope.lock() = scope;
        *self.current_query_text.lock() = raw.to_string();
        self.coordinator.submit(raw, scope)
    }

    /*
     * Closes the search panel: cancels in-flight work without waiting for
     * it, resets the scope to its default, and forgets the query text so
     * marker projection stops painting match markers.
     */
    pub fn close_search(&self) {
        *self.current_scope.lock() = SearchScope::default();
        self.current_query_text.lock().clear();
        self.coordinator.close();
    }

    /*
     * Recomputes the marker strip for one document view against the
     * currently active query. Pull-based: the renderer calls this whenever
     * content or query changes, and the returned set replaces the prior one
     * wholesale.
     */
    pub fn markers_for(&self, view: &DocumentViewSnapshot) -> Vec<ScrollbarMarker> {
        let query_text = self.current_query_text.lock().clone();
        marker_projector::project_markers(
            &view.headings,
            &view.rendered_text,
            &query_text,
            view.content_height,
        )
    }

    pub fn current_scope(&self) -> SearchScope {
        *self.current_scope.lock()
    }

    // Composes the status line the host window shows for this panel.
    pub fn status_line(&self) -> String {
        let mut line = "MarkScout".to_string();
        match &self.context.read().active_folder {
            Some(folder) => line = format!("{} - [{}]", line, folder.display()),
            None => line = format!("{line} - [No Folder Open]"),
        }
        let scope = match self.current_scope() {
            SearchScope::CurrentFolder => "Current Folder",
            SearchScope::OpenFiles => "Open Files",
            SearchScope::EntireWorkspace => "Entire Workspace",
        };
        format!("{line} - [{scope}]")
    }

    fn watch_root(&self, root: &Path) {
        match self.watcher.watch(root) {
            Ok(handle) => {
                let mut handles = self.watch_handles.lock();
                if !handles.contains(&handle) {
                    handles.push(handle);
                }
            }
            Err(e) => {
                log::warn!("SearchPanelLogic: Live updates unavailable for {root:?}: {e}");
                self.sink.on_watch_error(root, &e.to_string());
            }
        }
    }
}
