use crate::core::config::SearchTuning;
use crate::core::document_access::DocumentAccessOperations;
use crate::core::document_scanner;
use crate::core::folder_watcher::WatchEvent;
use crate::core::models::{
    SearchQuery, SearchResult, SearchResultBatch, SearchScope, WorkspaceContext,
};
use crate::core::path_utils;
use crate::core::presentation_state::{PresentationGuard, PresentationState};
use crate::core::query_debounce::QueryDebouncer;
use crate::core::scope_resolver::ScopeResolverOperations;
use parking_lot::RwLock;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/*
 * This module owns the authoritative query lifecycle: debouncing keystrokes,
 * cancelling superseded scans, dispatching per-document scanning across a
 * bounded worker pool, assembling the ordered result batch, and driving the
 * presentation state machine. It is the only writer of presentation
 * transitions and the only consumer of watcher events.
 *
 * Staleness is decided purely by sequence numbers drawn from one shared
 * monotonically increasing counter. `submit` bumps the counter on the caller
 * thread, so a scan already in flight on the worker observes supersession
 * between documents and its batch is dropped at emission time regardless of
 * which scan physically finishes first.
 */

/*
 * The notification surface observed by the embedding application. Implemented
 * by the excluded UI layer (and by recording mocks in tests). Calls arrive on
 * the coordinator's worker thread; implementations should hand off instead of
 * blocking.
 */
pub trait SearchEventSink: Send + Sync {
    fn on_result_batch(&self, batch: &SearchResultBatch);
    fn on_presentation_change(&self, state: PresentationState);
    fn on_document_changed(&self, path: &Path);
    fn on_watch_error(&self, root: &Path, reason: &str);
}

enum CoordinatorCommand {
    Submit(SearchQuery),
    Clear { sequence: u64 },
    Close { sequence: u64 },
    Watch(WatchEvent),
    Shutdown,
}

pub struct SearchCoordinator {
    latest_sequence: Arc<AtomicU64>,
    command_tx: Sender<CoordinatorCommand>,
    worker: Option<JoinHandle<()>>,
    forwarders: Vec<JoinHandle<()>>,
}

impl SearchCoordinator {
    /*
     * Builds the coordinator and starts its worker thread. Collaborators are
     * injected as trait objects so tests can substitute mocks; the
     * `WorkspaceContext` is shared with the facade, which updates it as the
     * user opens folders and tabs.
     */
    pub fn new(
        tuning: SearchTuning,
        resolver: Arc<dyn ScopeResolverOperations>,
        access: Arc<dyn DocumentAccessOperations>,
        context: Arc<RwLock<WorkspaceContext>>,
        sink: Arc<dyn SearchEventSink>,
    ) -> Self {
        let latest_sequence = Arc::new(AtomicU64::new(0));
        let (command_tx, command_rx) = mpsc::channel::<CoordinatorCommand>();

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(tuning.scan_workers.max(1))
            .thread_name(|i| format!("scan-worker-{i}"))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                log::error!("SearchCoordinator: Failed to build scan pool ({e}); scanning serially.");
                None
            }
        };

        let worker_state = CoordinatorWorker {
            debouncer: QueryDebouncer::new(Duration::from_millis(tuning.debounce_ms)),
            tuning,
            resolver,
            access,
            context,
            sink,
            latest_sequence: Arc::clone(&latest_sequence),
            guard: PresentationGuard::new(),
            active: None,
            pool,
        };

        let worker = thread::Builder::new()
            .name("search-coordinator".into())
            .spawn(move || worker_loop(worker_state, command_rx))
            .ok();
        if worker.is_none() {
            log::error!("SearchCoordinator: Failed to spawn worker thread; searches will not run.");
        }

        SearchCoordinator {
            latest_sequence,
            command_tx,
            worker,
            forwarders: Vec::new(),
        }
    }

    /*
     * Submits a new search intent and returns the immutable query that
     * represents it. Never blocks: the sequence number is assigned here and
     * the rest happens on the worker. An empty or whitespace-only query
     * requests the "cleared" transition instead of a scan.
     */
    pub fn submit(&self, raw: &str, scope: SearchScope) -> SearchQuery {
        let sequence = self.next_sequence();
        let query = SearchQuery::new(raw, scope, sequence);
        let command = if query.is_cleared() {
            CoordinatorCommand::Clear { sequence }
        } else {
            CoordinatorCommand::Submit(query.clone())
        };
        if self.command_tx.send(command).is_err() {
            log::warn!("SearchCoordinator: Worker gone; submit for seq {sequence} dropped.");
        }
        query
    }

    /*
     * Closes the search panel: supersedes any in-flight scan (without
     * waiting for it) and moves the presentation state to Closed.
     */
    pub fn close(&self) {
        let sequence = self.next_sequence();
        if self
            .command_tx
            .send(CoordinatorCommand::Close { sequence })
            .is_err()
        {
            log::warn!("SearchCoordinator: Worker gone; close dropped.");
        }
    }

    /*
     * Connects a watcher event stream. Changed events re-issue the active
     * query (debounced, so bulk operations like a checkout do not thrash);
     * Lost events surface as watch-error notifications.
     */
    pub fn attach_watch_events(&mut self, events: Receiver<WatchEvent>) {
        let command_tx = self.command_tx.clone();
        let forwarder = thread::Builder::new()
            .name("watch-event-forwarder".into())
            .spawn(move || {
                for event in events {
                    if command_tx.send(CoordinatorCommand::Watch(event)).is_err() {
                        return;
                    }
                }
            })
            .ok();
        if let Some(handle) = forwarder {
            self.forwarders.push(handle);
        } else {
            log::error!("SearchCoordinator: Failed to spawn watch-event forwarder.");
        }
    }

    // The sequence number most recently handed out. Diagnostic only.
    pub fn current_sequence(&self) -> u64 {
        self.latest_sequence.load(Ordering::SeqCst)
    }

    fn next_sequence(&self) -> u64 {
        self.latest_sequence.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Drop for SearchCoordinator {
    fn drop(&mut self) {
        let _ = self.command_tx.send(CoordinatorCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        // Forwarders end once their upstream watcher drops its stream.
        for handle in self.forwarders.drain(..) {
            let _ = handle.join();
        }
    }
}

// The raw query text and scope of the query currently on screen, kept so a
// relevant file-system change can re-issue it under a fresh sequence.
struct ActiveQuery {
    raw: String,
    scope: SearchScope,
}

struct CoordinatorWorker {
    tuning: SearchTuning,
    resolver: Arc<dyn ScopeResolverOperations>,
    access: Arc<dyn DocumentAccessOperations>,
    context: Arc<RwLock<WorkspaceContext>>,
    sink: Arc<dyn SearchEventSink>,
    latest_sequence: Arc<AtomicU64>,
    debouncer: QueryDebouncer,
    guard: PresentationGuard,
    active: Option<ActiveQuery>,
    pool: Option<rayon::ThreadPool>,
}

enum DocumentOutcome {
    Matches(Vec<SearchResult>),
    NoMatch,
    Skipped,
    Superseded,
}

fn worker_loop(mut worker: CoordinatorWorker, command_rx: Receiver<CoordinatorCommand>) {
    const IDLE: Duration = Duration::from_millis(250);
    loop {
        let timeout = worker
            .debouncer
            .time_until_fire(Instant::now())
            .unwrap_or(IDLE);
        match command_rx.recv_timeout(timeout) {
            Ok(CoordinatorCommand::Shutdown) => return,
            Ok(command) => worker.handle_command(command),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return,
        }

        // Let a rapid burst of queued commands settle before polling the
        // debouncer, so only the survivor fires.
        loop {
            match command_rx.try_recv() {
                Ok(CoordinatorCommand::Shutdown) => return,
                Ok(command) => worker.handle_command(command),
                Err(_) => break,
            }
        }

        if let Some(query) = worker.debouncer.poll(Instant::now()) {
            worker.run_scan(query);
        }
    }
}

impl CoordinatorWorker {
    fn handle_command(&mut self, command: CoordinatorCommand) {
        match command {
            CoordinatorCommand::Submit(query) => {
                self.active = Some(ActiveQuery {
                    raw: query.raw.clone(),
                    scope: query.scope,
                });
                self.debouncer.submit(query, Instant::now());
            }
            CoordinatorCommand::Clear { sequence } => {
                self.debouncer.cancel();
                self.active = None;
                let state = self.guard.clear(sequence);
                self.sink.on_presentation_change(state);
            }
            CoordinatorCommand::Close { sequence } => {
                self.debouncer.cancel();
                self.active = None;
                let state = self.guard.close(sequence);
                self.sink.on_presentation_change(state);
            }
            CoordinatorCommand::Watch(WatchEvent::Changed(change)) => {
                self.sink.on_document_changed(&change.path);
                self.reissue_if_relevant(&change.path);
            }
            CoordinatorCommand::Watch(WatchEvent::Lost { root, reason }) => {
                self.sink.on_watch_error(&root, &reason);
            }
            CoordinatorCommand::Shutdown => {}
        }
    }

    /*
     * Re-issues the active query under a fresh sequence number when a change
     * touches its scope. Membership can change on create/delete/rename, so
     * folder scopes only check root containment (plus the extension filter
     * for plain files); the re-issue goes through the normal debounce so a
     * bulk operation touching hundreds of files coalesces into one re-scan.
     */
    fn reissue_if_relevant(&mut self, changed_path: &Path) {
        let Some(active) = &self.active else {
            return;
        };
        let context = self.context.read().clone();
        if !change_is_relevant(changed_path, active.scope, &context, &self.tuning) {
            log::trace!("SearchCoordinator: Change to {changed_path:?} outside active scope.");
            return;
        }
        let sequence = self.latest_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let query = SearchQuery::new(active.raw.clone(), active.scope, sequence);
        log::debug!(
            "SearchCoordinator: Re-issuing query seq {sequence} after change to {changed_path:?}."
        );
        self.debouncer.submit(query, Instant::now());
    }

    /*
     * Executes one fired query end to end: resolve, scan, join, emit. Emission
     * is suppressed when the query was superseded at any point; the
     * presentation guard is the final arbiter.
     */
    fn run_scan(&mut self, query: SearchQuery) {
        if self.is_superseded(query.sequence) {
            log::trace!(
                "SearchCoordinator: Query seq {} superseded before scanning.",
                query.sequence
            );
            return;
        }

        let context = self.context.read().clone();
        let paths = self.resolver.resolve(query.scope, &context);
        log::debug!(
            "SearchCoordinator: Scanning {} document(s) for seq {}.",
            paths.len(),
            query.sequence
        );

        let (results, skipped_documents, superseded) = self.scan_documents(&paths, &query, &context);
        if superseded || self.is_superseded(query.sequence) {
            log::trace!(
                "SearchCoordinator: Discarding stale results for seq {}.",
                query.sequence
            );
            return;
        }

        let batch = SearchResultBatch {
            sequence: query.sequence,
            results,
            skipped_documents,
        };
        if let Some(state) = self.guard.apply_batch(&batch) {
            self.sink.on_result_batch(&batch);
            self.sink.on_presentation_change(state);
        }
    }

    /*
     * Scans every candidate on the bounded pool and joins all outputs before
     * returning; partial batches are never exposed. Supersession is checked
     * between documents (cooperative, coarse-grained); documents that fail
     * to read are skipped, never fatal.
     */
    fn scan_documents(
        &self,
        paths: &[PathBuf],
        query: &SearchQuery,
        context: &WorkspaceContext,
    ) -> (Vec<SearchResult>, usize, bool) {
        let latest = Arc::clone(&self.latest_sequence);
        let sequence = query.sequence;
        let access = Arc::clone(&self.access);
        let preview_cap = self.tuning.preview_lines_per_document;
        let raw = query.raw.clone();

        let scan_one = move |path: &PathBuf| -> DocumentOutcome {
            if latest.load(Ordering::Relaxed) > sequence {
                return DocumentOutcome::Superseded;
            }
            let text = match access.read_document(path) {
                Ok(text) => text,
                Err(e) => {
                    log::debug!("SearchCoordinator: Skipping unreadable document {path:?}: {e}");
                    return DocumentOutcome::Skipped;
                }
            };
            match document_scanner::scan_text(&text, &raw, preview_cap) {
                None => DocumentOutcome::NoMatch,
                Some(matches) => {
                    let display_name = display_name_for(path, context);
                    let results = matches
                        .previews
                        .into_iter()
                        .map(|preview| SearchResult {
                            path: path.clone(),
                            display_name: display_name.clone(),
                            line_number: preview.line_number,
                            match_count: matches.match_count,
                            preview: preview.text,
                        })
                        .collect();
                    DocumentOutcome::Matches(results)
                }
            }
        };

        // `paths` is already sorted by the resolver and the parallel collect
        // preserves input order, so the joined results are ordered by path,
        // then by line within each document.
        let outcomes: Vec<DocumentOutcome> = match &self.pool {
            Some(pool) => pool.install(|| paths.par_iter().map(&scan_one).collect()),
            None => paths.iter().map(&scan_one).collect(),
        };

        let mut results = Vec::new();
        let mut skipped_documents = 0;
        let mut superseded = false;
        for outcome in outcomes {
            match outcome {
                DocumentOutcome::Matches(mut document_results) => {
                    results.append(&mut document_results);
                }
                DocumentOutcome::NoMatch => {}
                DocumentOutcome::Skipped => skipped_documents += 1,
                DocumentOutcome::Superseded => superseded = true,
            }
        }
        (results, skipped_documents, superseded)
    }

    fn is_superseded(&self, sequence: u64) -> bool {
        self.latest_sequence.load(Ordering::SeqCst) > sequence
    }
}

// Prefers the tab's display name when the document is open; otherwise the
// file name carries enough identity for the result list.
fn display_name_for(path: &Path, context: &WorkspaceContext) -> String {
    let normalized = path_utils::normalize_document_path(path);
    for document in &context.open_documents {
        if path_utils::normalize_document_path(&document.path) == normalized {
            return document.display_name.clone();
        }
    }
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn change_is_relevant(
    changed_path: &Path,
    scope: SearchScope,
    context: &WorkspaceContext,
    tuning: &SearchTuning,
) -> bool {
    // A changed file with an unsupported extension can never enter or leave
    // the result set. Paths without an extension may be directories, whose
    // create/delete/rename moves whole subtrees, so they stay relevant.
    if changed_path.extension().is_some()
        && !path_utils::is_supported_document(changed_path, &tuning.supported_extensions)
    {
        return false;
    }
    match scope {
        SearchScope::CurrentFolder => context
            .active_folder
            .as_ref()
            .is_some_and(|root| path_utils::is_within_root(changed_path, root)),
        SearchScope::EntireWorkspace => context
            .all_roots()
            .iter()
            .any(|root| path_utils::is_within_root(changed_path, root)),
        SearchScope::OpenFiles => {
            let normalized = path_utils::normalize_document_path(changed_path);
            context
                .open_documents
                .iter()
                .any(|doc| path_utils::normalize_document_path(&doc.path) == normalized)
        }
    }
}
