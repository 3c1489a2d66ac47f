use crate::core::models::{ChangeEvent, ChangeKind};
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/*
 * This module maintains live subscriptions to file-system changes for the
 * open folder and any connected workspace mirrors, and delivers coalesced
 * ChangeEvents. Raw OS notifications arrive on the `notify` watcher's
 * callback thread, are forwarded over an mpsc channel, and are buffered by a
 * pump thread in a per-path coalescing window so that editor bursts
 * (truncate-then-rewrite, atomic saves) collapse into one logical event with
 * the dominant kind.
 *
 * If an OS subscription is lost, the watcher emits one terminal
 * `WatchEvent::Lost` for that registration and stops producing events for
 * it; it never retries on its own. The caller decides whether to re-watch.
 */

#[derive(Debug)]
pub enum WatchError {
    /*
     * The path cannot be watched: it does not exist, is not a directory, or
     * the platform denied a recursive subscription. Callers fall back to
     * manual refresh.
     */
    Unavailable { path: PathBuf, reason: String },
}

impl std::fmt::Display for WatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchError::Unavailable { path, reason } => {
                write!(f, "Cannot watch {path:?}: {reason}")
            }
        }
    }
}

impl std::error::Error for WatchError {}

pub type Result<T> = std::result::Result<T, WatchError>;

// Identifies one watch registration. Watching an already-watched root
// returns the existing handle rather than a duplicate OS subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchHandle {
    id: u64,
    root: PathBuf,
}

impl WatchHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

// What the watcher's event stream carries: coalesced changes, or a terminal
// loss notification for one registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Changed(ChangeEvent),
    Lost { root: PathBuf, reason: String },
}

// Raw signals from notify callbacks to the pump thread.
enum RawSignal {
    Notification {
        watcher_id: u64,
        path: PathBuf,
        kind: ChangeKind,
    },
    Failure {
        watcher_id: u64,
        root: PathBuf,
        reason: String,
    },
    Shutdown,
}

/*
 * Pure, poll-based coalescing buffer. Each path's window anchors at its
 * first raw notification; later notifications within the window only upgrade
 * the kind (per `ChangeKind::dominant`), so a burst emits exactly one event
 * at first-event + window. Driven by the pump thread with explicit `Instant`
 * values, which keeps it deterministic under test.
 */
#[derive(Debug)]
pub struct ChangeCoalescer {
    window: Duration,
    pending: HashMap<PathBuf, PendingChange>,
}

#[derive(Debug)]
struct PendingChange {
    kind: ChangeKind,
    watcher_id: u64,
    deadline: Instant,
}

impl ChangeCoalescer {
    pub fn new(window: Duration) -> Self {
        ChangeCoalescer {
            window,
            pending: HashMap::new(),
        }
    }

    pub fn push(&mut self, path: PathBuf, kind: ChangeKind, watcher_id: u64, now: Instant) {
        match self.pending.get_mut(&path) {
            Some(pending) => {
                pending.kind = pending.kind.clone().dominant(kind);
            }
            None => {
                self.pending.insert(
                    path,
                    PendingChange {
                        kind,
                        watcher_id,
                        deadline: now + self.window,
                    },
                );
            }
        }
    }

    /*
     * Removes and returns every pending change whose window has elapsed at
     * `now`, ordered by path for cross-path determinism. Per-path ordering
     * is inherent: one path has at most one pending entry.
     */
    pub fn drain_ready(&mut self, now: Instant) -> Vec<ChangeEvent> {
        let ready_paths: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, pending)| now >= pending.deadline)
            .map(|(path, _)| path.clone())
            .collect();

        let mut events = Vec::with_capacity(ready_paths.len());
        for path in ready_paths {
            if let Some(pending) = self.pending.remove(&path) {
                events.push(ChangeEvent {
                    path,
                    kind: pending.kind,
                    watcher_id: pending.watcher_id,
                });
            }
        }
        events.sort_by(|a, b| a.path.cmp(&b.path));
        events
    }

    // How long the pump may sleep before the earliest pending window closes.
    pub fn next_deadline(&self, now: Instant) -> Option<Duration> {
        self.pending
            .values()
            .map(|pending| pending.deadline.saturating_duration_since(now))
            .min()
    }

    // Drops everything buffered for a registration whose subscription died.
    pub fn discard_watcher(&mut self, watcher_id: u64) {
        self.pending
            .retain(|_, pending| pending.watcher_id != watcher_id);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

struct Registration {
    handle: WatchHandle,
    /* Kept alive to maintain the OS subscription; dropped on unwatch. */
    _watcher: RecommendedWatcher,
}

pub struct FolderWatcher {
    registrations: Arc<Mutex<HashMap<PathBuf, Registration>>>,
    raw_tx: Sender<RawSignal>,
    event_rx: Option<Receiver<WatchEvent>>,
    pump: Option<JoinHandle<()>>,
    next_watcher_id: AtomicU64,
}

impl FolderWatcher {
    /*
     * Creates the watcher with its pump thread running. `coalesce_window` is
     * the per-path buffering window for raw notifications (150-300 ms is the
     * intended range).
     */
    pub fn new(coalesce_window: Duration) -> Self {
        let (raw_tx, raw_rx) = mpsc::channel::<RawSignal>();
        let (event_tx, event_rx) = mpsc::channel::<WatchEvent>();

        let pump = thread::Builder::new()
            .name("folder-watcher-pump".into())
            .spawn(move || pump_loop(raw_rx, event_tx, ChangeCoalescer::new(coalesce_window)))
            .ok();
        if pump.is_none() {
            log::error!("FolderWatcher: Failed to spawn pump thread; no events will flow.");
        }

        FolderWatcher {
            registrations: Arc::new(Mutex::new(HashMap::new())),
            raw_tx,
            event_rx: Some(event_rx),
            pump,
            next_watcher_id: AtomicU64::new(1),
        }
    }

    /*
     * Registers a recursive watch on `root`. Idempotent: a root that is
     * already watched yields the existing handle. Fails with
     * `WatchError::Unavailable` when the path is missing or the platform
     * refuses the subscription.
     */
    pub fn watch(&self, root: &Path) -> Result<WatchHandle> {
        if !root.is_dir() {
            return Err(WatchError::Unavailable {
                path: root.to_path_buf(),
                reason: "path does not exist or is not a directory".to_string(),
            });
        }
        let canonical = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());

        let mut registrations = self.registrations.lock();
        if let Some(existing) = registrations.get(&canonical) {
            log::debug!("FolderWatcher: Root {canonical:?} already watched; reusing handle.");
            return Ok(existing.handle.clone());
        }

        let watcher_id = self.next_watcher_id.fetch_add(1, Ordering::SeqCst);
        let handle = WatchHandle {
            id: watcher_id,
            root: canonical.clone(),
        };

        let raw_tx = self.raw_tx.clone();
        let callback_root = canonical.clone();
        let mut watcher = notify::recommended_watcher(
            move |result: std::result::Result<notify::Event, notify::Error>| match result {
                Ok(event) => {
                    for (path, kind) in classify_raw_event(&event) {
                        let _ = raw_tx.send(RawSignal::Notification {
                            watcher_id,
                            path,
                            kind,
                        });
                    }
                }
                Err(e) => {
                    let _ = raw_tx.send(RawSignal::Failure {
                        watcher_id,
                        root: callback_root.clone(),
                        reason: e.to_string(),
                    });
                }
            },
        )
        .map_err(|e| WatchError::Unavailable {
            path: canonical.clone(),
            reason: e.to_string(),
        })?;

        watcher
            .watch(&canonical, RecursiveMode::Recursive)
            .map_err(|e| WatchError::Unavailable {
                path: canonical.clone(),
                reason: e.to_string(),
            })?;

        log::info!("FolderWatcher: Watching {canonical:?} (id {watcher_id}).");
        registrations.insert(
            canonical,
            Registration {
                handle: handle.clone(),
                _watcher: watcher,
            },
        );
        Ok(handle)
    }

    /*
     * Releases the OS subscription behind `handle`. Safe to call repeatedly;
     * a handle that was already released (or superseded by a newer watch of
     * the same root) is a no-op.
     */
    pub fn unwatch(&self, handle: &WatchHandle) {
        let mut registrations = self.registrations.lock();
        let matches_handle = registrations
            .get(&handle.root)
            .is_some_and(|reg| reg.handle.id == handle.id);
        if matches_handle {
            registrations.remove(&handle.root);
            log::info!("FolderWatcher: Released watch on {:?}.", handle.root);
        }
    }

    /*
     * Takes the event stream. The stream is infinite and not restartable:
     * it can be taken exactly once per watcher instance.
     */
    pub fn take_events(&mut self) -> Option<Receiver<WatchEvent>> {
        self.event_rx.take()
    }

    pub fn is_watching(&self, root: &Path) -> bool {
        let canonical = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        self.registrations.lock().contains_key(&canonical)
    }
}

impl Drop for FolderWatcher {
    fn drop(&mut self) {
        // Drop OS subscriptions first so no further raw signals arrive, then
        // stop the pump.
        self.registrations.lock().clear();
        let _ = self.raw_tx.send(RawSignal::Shutdown);
        if let Some(pump) = self.pump.take() {
            let _ = pump.join();
        }
    }
}

/*
 * Maps one raw notify event onto logical (path, kind) pairs. A rename
 * reported with both endpoints becomes a single `Renamed`; one-sided rename
 * halves (as inotify delivers them) become the Deleted/Created pair they
 * are semantically, so scope membership stays correct. Access-only events
 * are dropped.
 */
fn classify_raw_event(event: &notify::Event) -> Vec<(PathBuf, ChangeKind)> {
    match &event.kind {
        EventKind::Create(_) => event
            .paths
            .iter()
            .map(|p| (p.clone(), ChangeKind::Created))
            .collect(),
        EventKind::Remove(_) => event
            .paths
            .iter()
            .map(|p| (p.clone(), ChangeKind::Deleted))
            .collect(),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::Both if event.paths.len() == 2 => vec![(
                event.paths[1].clone(),
                ChangeKind::Renamed {
                    old_path: event.paths[0].clone(),
                },
            )],
            RenameMode::From => event
                .paths
                .iter()
                .map(|p| (p.clone(), ChangeKind::Deleted))
                .collect(),
            RenameMode::To => event
                .paths
                .iter()
                .map(|p| (p.clone(), ChangeKind::Created))
                .collect(),
            _ => event
                .paths
                .iter()
                .map(|p| (p.clone(), ChangeKind::Modified))
                .collect(),
        },
        EventKind::Modify(_) | EventKind::Any => event
            .paths
            .iter()
            .map(|p| (p.clone(), ChangeKind::Modified))
            .collect(),
        EventKind::Access(_) | EventKind::Other => Vec::new(),
    }
}

/*
 * Pump thread body: drains raw signals into the coalescer and emits ready
 * events. Registrations whose subscription failed are marked dead, their
 * buffered changes discarded, and exactly one `Lost` event is emitted.
 */
fn pump_loop(
    raw_rx: Receiver<RawSignal>,
    event_tx: Sender<WatchEvent>,
    mut coalescer: ChangeCoalescer,
) {
    const IDLE_POLL: Duration = Duration::from_millis(200);
    let mut dead_watchers: HashSet<u64> = HashSet::new();

    loop {
        let timeout = coalescer
            .next_deadline(Instant::now())
            .unwrap_or(IDLE_POLL);
        match raw_rx.recv_timeout(timeout) {
            Ok(RawSignal::Notification {
                watcher_id,
                path,
                kind,
            }) => {
                if !dead_watchers.contains(&watcher_id) {
                    coalescer.push(path, kind, watcher_id, Instant::now());
                }
            }
            Ok(RawSignal::Failure {
                watcher_id,
                root,
                reason,
            }) => {
                if dead_watchers.insert(watcher_id) {
                    log::warn!("FolderWatcher: Subscription lost for {root:?}: {reason}");
                    coalescer.discard_watcher(watcher_id);
                    if event_tx.send(WatchEvent::Lost { root, reason }).is_err() {
                        return;
                    }
                }
            }
            Ok(RawSignal::Shutdown) => return,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return,
        }

        for change in coalescer.drain_ready(Instant::now()) {
            log::trace!(
                "FolderWatcher: Emitting {:?} for {:?}.",
                change.kind,
                change.path
            );
            if event_tx.send(WatchEvent::Changed(change)).is_err() {
                return;
            }
        }
    }
}
