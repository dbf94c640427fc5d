//! Load unit lifecycle record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::priority::{Category, Priority};

/// Lifecycle state of a load unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    /// Created but not yet handed to the queue.
    Pending,
    /// In the queue, waiting for a concurrency slot.
    Queued,
    /// Loader future is executing.
    Loading,
    /// Loader resolved successfully.
    Loaded,
    /// Loader rejected. Eligible for manual retry.
    Failed,
}

/// One schedulable piece of deferred work backing a UI unit.
///
/// Created when the consuming unit mounts; disposed when it unmounts.
/// Queued-but-unstarted work is cancelled on disposal, started work runs
/// to completion and its result is discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadUnit {
    pub id: String,
    /// Effective priority the unit was scheduled at.
    pub priority: Priority,
    pub category: Category,
    pub state: LoadState,
    pub enqueued_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Number of manual retries after failure.
    pub retry_count: u32,
}

impl LoadUnit {
    /// Create a fresh unit in the Pending state.
    pub fn new(id: impl Into<String>, priority: Priority, category: Category) -> Self {
        Self {
            id: id.into(),
            priority,
            category,
            state: LoadState::Pending,
            enqueued_at: None,
            started_at: None,
            completed_at: None,
            retry_count: 0,
        }
    }

    /// Whether the unit has reached a terminal state.
    pub fn is_settled(&self) -> bool {
        matches!(self.state, LoadState::Loaded | LoadState::Failed)
    }

    /// Wall-clock load duration, when both timestamps are recorded.
    pub fn load_duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}
