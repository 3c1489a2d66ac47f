use crate::core::models::SearchQuery;
use std::time::{Duration, Instant};

/*
 * A pure, poll-based debounce state machine for query submissions. The
 * coordinator's worker thread drives it with explicit `Instant` values, so
 * no timer service or event loop is involved and tests advance virtual time
 * deterministically instead of sleeping.
 *
 * Each submission replaces the pending query and restarts the inactivity
 * window; `poll` releases the pending query once the window has elapsed.
 * Only the survivor of a burst of submissions ever fires.
 */
#[derive(Debug)]
pub struct QueryDebouncer {
    window: Duration,
    pending: Option<PendingQuery>,
}

#[derive(Debug)]
struct PendingQuery {
    query: SearchQuery,
    deadline: Instant,
}

impl QueryDebouncer {
    pub fn new(window: Duration) -> Self {
        QueryDebouncer {
            window,
            pending: None,
        }
    }

    /*
     * Records `query` as the pending intent, superseding any previously
     * pending one, and restarts the inactivity window from `now`.
     */
    pub fn submit(&mut self, query: SearchQuery, now: Instant) {
        log::trace!(
            "QueryDebouncer: Pending query seq {} ('{}').",
            query.sequence,
            query.raw
        );
        self.pending = Some(PendingQuery {
            query,
            deadline: now + self.window,
        });
    }

    // Discards the pending query, if any, without firing it.
    pub fn cancel(&mut self) -> Option<SearchQuery> {
        self.pending.take().map(|p| p.query)
    }

    /*
     * Releases the pending query if its inactivity window has elapsed at
     * `now`. Returns `None` while the window is still open or nothing is
     * pending.
     */
    pub fn poll(&mut self, now: Instant) -> Option<SearchQuery> {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|pending| now >= pending.deadline);
        if due {
            self.pending.take().map(|p| p.query)
        } else {
            None
        }
    }

    // How long the driving loop may sleep before the pending query is due.
    pub fn time_until_fire(&self, now: Instant) -> Option<Duration> {
        self.pending
            .as_ref()
            .map(|p| p.deadline.saturating_duration_since(now))
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}
