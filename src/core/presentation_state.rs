use crate::core::models::SearchResultBatch;
use serde::Serialize;

/*
 * The small state machine behind the search panel: what the excluded UI
 * layer should currently show. Transitions are driven solely by the most
 * recently accepted (non-stale) result batch, by an explicit clear (back to
 * the prompt), or by an explicit close/hide request.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PresentationState {
    /* The panel is hidden entirely. */
    Closed,
    /* The panel is open with no settled query yet. Initial state. */
    Prompt,
    /* The last accepted batch had results. */
    Results,
    /* The last accepted batch was empty. */
    NoResults,
}

/*
 * Applies result batches to the presentation state while enforcing the
 * staleness invariant: a batch whose sequence number is lower than the last
 * applied one is silently dropped, so observers only ever see states derived
 * from batches in non-decreasing sequence order, independent of which scan
 * physically finished first.
 */
#[derive(Debug)]
pub struct PresentationGuard {
    state: PresentationState,
    last_applied_sequence: u64,
}

impl PresentationGuard {
    pub fn new() -> Self {
        PresentationGuard {
            state: PresentationState::Prompt,
            last_applied_sequence: 0,
        }
    }

    pub fn state(&self) -> PresentationState {
        self.state
    }

    pub fn last_applied_sequence(&self) -> u64 {
        self.last_applied_sequence
    }

    /*
     * Applies a batch and returns the new state, or `None` when the batch is
     * stale and was discarded. Discarding is purely an internal correctness
     * mechanism and is never surfaced to the user.
     */
    pub fn apply_batch(&mut self, batch: &SearchResultBatch) -> Option<PresentationState> {
        if batch.sequence < self.last_applied_sequence {
            log::trace!(
                "PresentationGuard: Discarding stale batch seq {} (last applied {}).",
                batch.sequence,
                self.last_applied_sequence
            );
            return None;
        }
        self.last_applied_sequence = batch.sequence;
        self.state = if batch.is_empty() {
            PresentationState::NoResults
        } else {
            PresentationState::Results
        };
        Some(self.state)
    }

    /*
     * An explicit clear (empty query). Advances the applied sequence so any
     * in-flight scan from before the clear can no longer apply, and returns
     * to the prompt.
     */
    pub fn clear(&mut self, sequence: u64) -> PresentationState {
        self.last_applied_sequence = self.last_applied_sequence.max(sequence);
        self.state = PresentationState::Prompt;
        self.state
    }

    /*
     * An explicit close/hide request. Like `clear`, but the panel is hidden;
     * in-flight work is abandoned without waiting for it.
     */
    pub fn close(&mut self, sequence: u64) -> PresentationState {
        self.last_applied_sequence = self.last_applied_sequence.max(sequence);
        self.state = PresentationState::Closed;
        self.state
    }

    // A show request reopens the panel at the prompt.
    pub fn open(&mut self) -> PresentationState {
        if self.state == PresentationState::Closed {
            self.state = PresentationState::Prompt;
        }
        self.state
    }
}

impl Default for PresentationGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{SearchResult, SearchResultBatch};
    use std::path::PathBuf;

    fn batch(sequence: u64, result_count: usize) -> SearchResultBatch {
        let results = (0..result_count)
            .map(|i| SearchResult {
                path: PathBuf::from(format!("/notes/doc_{i}.md")),
                display_name: format!("doc_{i}.md"),
                line_number: 1,
                match_count: 1,
                preview: "preview".to_string(),
            })
            .collect();
        SearchResultBatch {
            sequence,
            results,
            skipped_documents: 0,
        }
    }

    #[test]
    fn test_initial_state_is_prompt() {
        assert_eq!(PresentationGuard::new().state(), PresentationState::Prompt);
    }

    #[test]
    fn test_non_empty_batch_moves_to_results() {
        let mut guard = PresentationGuard::new();
        assert_eq!(
            guard.apply_batch(&batch(1, 2)),
            Some(PresentationState::Results)
        );
    }

    #[test]
    fn test_empty_batch_moves_to_no_results() {
        let mut guard = PresentationGuard::new();
        assert_eq!(
            guard.apply_batch(&batch(1, 0)),
            Some(PresentationState::NoResults)
        );
    }

    #[test]
    fn test_stale_batch_is_discarded() {
        let mut guard = PresentationGuard::new();
        guard.apply_batch(&batch(5, 1));

        assert_eq!(guard.apply_batch(&batch(3, 4)), None);
        assert_eq!(guard.state(), PresentationState::Results);
        assert_eq!(guard.last_applied_sequence(), 5);
    }

    #[test]
    fn test_applied_sequences_are_non_decreasing() {
        let mut guard = PresentationGuard::new();
        let mut observed = Vec::new();
        for sequence in [1u64, 3, 2, 7, 5, 7, 8] {
            if guard.apply_batch(&batch(sequence, 1)).is_some() {
                observed.push(sequence);
            }
        }
        assert_eq!(observed, vec![1, 3, 7, 7, 8]);
        assert!(observed.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_clear_returns_to_prompt_and_blocks_in_flight_batches() {
        let mut guard = PresentationGuard::new();
        guard.apply_batch(&batch(2, 1));

        assert_eq!(guard.clear(3), PresentationState::Prompt);
        // The scan that was in flight when the user cleared must not land.
        assert_eq!(guard.apply_batch(&batch(2, 5)), None);
        assert_eq!(guard.state(), PresentationState::Prompt);
    }

    #[test]
    fn test_close_hides_panel_and_open_returns_to_prompt() {
        let mut guard = PresentationGuard::new();
        guard.apply_batch(&batch(1, 1));

        assert_eq!(guard.close(2), PresentationState::Closed);
        assert_eq!(guard.open(), PresentationState::Prompt);
    }

    #[test]
    fn test_open_does_not_reset_visible_results() {
        let mut guard = PresentationGuard::new();
        guard.apply_batch(&batch(1, 1));
        assert_eq!(guard.open(), PresentationState::Results);
    }
}
