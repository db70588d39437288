//! Shared per-batch state: status rows, counters and the completion ledger
//!
//! Every mutation goes through one `tokio::sync::Mutex` per structure and no
//! critical section performs I/O.

use crate::types::{BatchReport, Counters, ItemStatus, StatusTone};
use crate::ui::format::{STATUS_DONE, STATUS_PRESENT, failed_status};
use crate::ui::layout::compose_line;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::Mutex;

/// Final outcome of one item in a pass
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Acquired in this pass
    Success,
    /// Already complete (ledger hit or file on disk)
    Skipped,
    /// Every account failed; carries the error text
    Failed(String),
}

#[derive(Debug, Default)]
struct BatchState {
    statuses: Vec<ItemStatus>,
    counters: Counters,
    failed_ordinals: Vec<usize>,
}

/// Status table and counters shared by the workers and the renderer
#[derive(Debug)]
pub struct BatchContext {
    state: Mutex<BatchState>,
    width: usize,
}

impl BatchContext {
    /// Context over `rows`, whose indices must be dense from zero
    ///
    /// `width` bounds failure messages written into rows.
    pub fn new(rows: Vec<ItemStatus>, width: usize) -> Self {
        debug_assert!(rows.iter().enumerate().all(|(i, row)| row.index == i));
        Self {
            state: Mutex::new(BatchState {
                statuses: rows,
                ..Default::default()
            }),
            width,
        }
    }

    /// Terminal width captured when the batch started
    pub fn width(&self) -> usize {
        self.width
    }

    /// Set a row's in-flight status
    ///
    /// Returns `false` without touching the row when the text is unchanged or
    /// the row has already reached a terminal tone.
    pub async fn update_status(&self, index: usize, status: &str, tone: StatusTone) -> bool {
        let mut state = self.state.lock().await;
        let Some(row) = state.statuses.get_mut(index) else {
            return false;
        };
        if row.tone.is_terminal() || row.status == status {
            return false;
        }
        row.status = status.to_string();
        row.tone = tone;
        true
    }

    /// Record the final outcome of an item in its row and in the counters
    ///
    /// Returns `false` if the row was already terminal, in which case nothing
    /// is counted.
    pub async fn record_outcome(&self, index: usize, outcome: &ItemOutcome) -> bool {
        let (status, tone) = match outcome {
            ItemOutcome::Success => (STATUS_DONE.to_string(), StatusTone::Success),
            ItemOutcome::Skipped => (STATUS_PRESENT.to_string(), StatusTone::Skipped),
            ItemOutcome::Failed(message) => {
                (failed_status(message, self.width), StatusTone::Failed)
            }
        };

        let mut state = self.state.lock().await;
        let Some(row) = state.statuses.get_mut(index) else {
            return false;
        };
        if row.tone.is_terminal() {
            return false;
        }
        row.status = status;
        row.tone = tone;
        let ordinal = row.ordinal;

        state.counters.total += 1;
        match outcome {
            ItemOutcome::Success => state.counters.success += 1,
            ItemOutcome::Skipped => state.counters.skipped += 1,
            ItemOutcome::Failed(_) => {
                state.counters.failed += 1;
                state.failed_ordinals.push(ordinal);
            }
        }
        true
    }

    /// Count one non-fatal warning
    pub async fn record_warning(&self) {
        self.state.lock().await.counters.warned += 1;
    }

    /// Current counters
    pub async fn counters(&self) -> Counters {
        self.state.lock().await.counters
    }

    /// Copy of every row
    pub async fn statuses(&self) -> Vec<ItemStatus> {
        self.state.lock().await.statuses.clone()
    }

    /// Copy of one row
    pub async fn status(&self, index: usize) -> Option<ItemStatus> {
        self.state.lock().await.statuses.get(index).cloned()
    }

    /// Compose every row for `width`; the lock is released before returning
    pub async fn render_lines(&self, width: usize) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .statuses
            .iter()
            .map(|row| compose_line(row, width))
            .collect()
    }

    /// Final report for the pass
    pub async fn report(&self, collection_id: &str) -> BatchReport {
        let state = self.state.lock().await;
        let mut failed_ordinals = state.failed_ordinals.clone();
        failed_ordinals.sort_unstable();
        BatchReport {
            collection_id: collection_id.to_string(),
            counters: state.counters,
            failed_ordinals,
        }
    }
}

/// Per-collection record of ordinals already confirmed on disk
///
/// Shared across passes of a session so a rerun skips finished items. Entries
/// only grow until [`clear`](Self::clear).
#[derive(Debug, Default)]
pub struct CompletionLedger {
    entries: Mutex<HashMap<String, BTreeSet<usize>>>,
}

impl CompletionLedger {
    /// Empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `ordinal` of `collection_id` is complete
    pub async fn contains(&self, collection_id: &str, ordinal: usize) -> bool {
        self.entries
            .lock()
            .await
            .get(collection_id)
            .is_some_and(|done| done.contains(&ordinal))
    }

    /// Mark `ordinal` of `collection_id` complete; returns `false` if it already was
    pub async fn mark(&self, collection_id: &str, ordinal: usize) -> bool {
        self.entries
            .lock()
            .await
            .entry(collection_id.to_string())
            .or_default()
            .insert(ordinal)
    }

    /// Completed ordinals for `collection_id`
    pub async fn completed(&self, collection_id: &str) -> BTreeSet<usize> {
        self.entries
            .lock()
            .await
            .get(collection_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Forget everything, for a fresh session
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}
