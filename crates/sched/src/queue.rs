//! Resource-aware, bounded-concurrency priority load queue.
//!
//! Ordering is strict priority (Critical first), FIFO within a priority —
//! insertion order is preserved, no starvation reordering. The concurrency
//! limit adapts to environment snapshots and applies when the next slot is
//! filled, never retroactively to in-flight tasks. The queue never retries
//! on its own; retry is the wrapper's responsibility.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use stump_core::{Category, LoadState, LoadUnit, NoopTelemetry, Priority, QueueConfig, TelemetrySink};
use stump_sensor::EnvironmentSnapshot;

use crate::error::{LoadError, SchedError};

/// Future produced by a load task.
pub type LoadFuture = Pin<Box<dyn Future<Output = Result<(), LoadError>> + Send>>;

/// One-shot load task body.
pub type LoadFn = Box<dyn FnOnce() -> LoadFuture + Send>;

/// Reusable loader factory, so a failed unit can be retried.
pub type LoadFactory = Arc<dyn Fn() -> LoadFuture + Send + Sync>;

/// Read-only queue counters, safe to poll at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub queued: usize,
    pub loading: usize,
    pub completed: usize,
    pub failed: usize,
    pub max_concurrency: usize,
}

struct QueuedTask {
    id: String,
    load_fn: LoadFn,
}

struct Inner {
    /// Keyed by (priority, sequence): BTreeMap iteration order is exactly
    /// the drain order.
    pending: BTreeMap<(Priority, u64), QueuedTask>,
    /// Unit records for every id the queue has seen.
    units: HashMap<String, LoadUnit>,
    seq: u64,
    loading: usize,
}

impl Inner {
    fn pop_next(&mut self) -> Option<QueuedTask> {
        let key = *self.pending.keys().next()?;
        self.pending.remove(&key)
    }
}

/// Bounded-concurrency priority queue that executes load tasks.
pub struct LoadQueue {
    inner: Mutex<Inner>,
    max_concurrency: AtomicUsize,
    config: QueueConfig,
    telemetry: Arc<dyn TelemetrySink>,
}

impl LoadQueue {
    pub fn new(config: QueueConfig, telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                pending: BTreeMap::new(),
                units: HashMap::new(),
                seq: 0,
                loading: 0,
            }),
            max_concurrency: AtomicUsize::new(config.base_concurrency.max(1)),
            config,
            telemetry,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(QueueConfig::default(), Arc::new(NoopTelemetry))
    }

    /// Insert a task. A failed id re-enters as a retry (`retry_count`
    /// incremented); an id currently queued or loading is rejected.
    pub fn enqueue(
        &self,
        id: &str,
        load_fn: LoadFn,
        priority: Priority,
        category: Category,
    ) -> Result<(), SchedError> {
        let mut inner = self.inner.lock().unwrap();

        let unit = match inner.units.get_mut(id) {
            Some(unit) if matches!(unit.state, LoadState::Queued | LoadState::Loading) => {
                return Err(SchedError::AlreadyQueued(id.to_string()));
            }
            Some(unit) if unit.state == LoadState::Failed => {
                // Manual retry path.
                unit.retry_count += 1;
                unit.priority = priority;
                unit.category = category;
                unit.state = LoadState::Queued;
                unit.enqueued_at = Some(Utc::now());
                unit.started_at = None;
                unit.completed_at = None;
                unit.clone()
            }
            _ => {
                // Fresh unit, or a reload of a previously loaded id.
                let mut unit = LoadUnit::new(id, priority, category);
                unit.state = LoadState::Queued;
                unit.enqueued_at = Some(Utc::now());
                unit
            }
        };
        inner.units.insert(id.to_string(), unit);

        inner.seq += 1;
        let key = (priority, inner.seq);
        inner.pending.insert(
            key,
            QueuedTask {
                id: id.to_string(),
                load_fn,
            },
        );
        debug!(id, priority = %priority, category = %category, "task enqueued");
        Ok(())
    }

    /// Remove a queued-but-unstarted task. Started tasks run to completion.
    pub fn cancel(&self, id: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let key = inner
            .pending
            .iter()
            .find(|(_, task)| task.id == id)
            .map(|(key, _)| *key);
        match key {
            Some(key) => {
                inner.pending.remove(&key);
                inner.units.remove(id);
                debug!(id, "queued task cancelled");
                true
            }
            None => false,
        }
    }

    /// Drain the queue, keeping at most `max_concurrency` tasks in flight.
    /// Returns when the queue is empty and all started work has settled.
    pub async fn process_queue(&self) {
        let mut in_flight: FuturesUnordered<
            Pin<Box<dyn Future<Output = (String, Result<(), LoadError>)> + Send>>,
        > = FuturesUnordered::new();

        loop {
            // Fill free slots in strict (priority, insertion) order. The
            // limit is re-read per slot, so adjustments apply from the next
            // fill onward.
            loop {
                let limit = self.max_concurrency.load(Ordering::Relaxed).max(1);
                let task = {
                    let mut inner = self.inner.lock().unwrap();
                    if inner.loading >= limit {
                        None
                    } else {
                        inner.pop_next().map(|task| {
                            inner.loading += 1;
                            if let Some(unit) = inner.units.get_mut(&task.id) {
                                unit.state = LoadState::Loading;
                                unit.started_at = Some(Utc::now());
                            }
                            task
                        })
                    }
                };
                match task {
                    Some(task) => {
                        debug!(id = %task.id, "task started");
                        let id = task.id;
                        let fut = (task.load_fn)();
                        in_flight.push(Box::pin(async move { (id, fut.await) }));
                    }
                    None => break,
                }
            }

            match in_flight.next().await {
                Some((id, result)) => self.finish(&id, result),
                None => {
                    // Nothing of ours in flight. Another drain may hold all
                    // the slots; back off until its tasks settle.
                    if self.inner.lock().unwrap().pending.is_empty() {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            }
        }
    }

    fn finish(&self, id: &str, result: Result<(), LoadError>) {
        let unit = {
            let mut inner = self.inner.lock().unwrap();
            inner.loading = inner.loading.saturating_sub(1);
            inner.units.get_mut(id).map(|unit| {
                unit.completed_at = Some(Utc::now());
                unit.state = match result {
                    Ok(()) => LoadState::Loaded,
                    Err(_) => LoadState::Failed,
                };
                unit.clone()
            })
        };

        let Some(unit) = unit else { return };
        match result {
            Ok(()) => {
                debug!(id, duration_ms = ?unit.load_duration_ms(), "task loaded");
                self.telemetry.record(
                    "load.completed",
                    json!({
                        "id": id,
                        "priority": unit.priority.as_str(),
                        "category": unit.category.as_str(),
                        "duration_ms": unit.load_duration_ms(),
                        "retry_count": unit.retry_count,
                    }),
                );
            }
            Err(err) => {
                warn!(id, error = %err, "task failed");
                self.telemetry.record(
                    "load.failed",
                    json!({
                        "id": id,
                        "priority": unit.priority.as_str(),
                        "category": unit.category.as_str(),
                        "error": err.to_string(),
                        "retry_count": unit.retry_count,
                    }),
                );
            }
        }
    }

    /// Adapt the concurrency limit to an environment snapshot: halved
    /// (floor, minimum 1) under low-end device or slow network, boosted by
    /// the configured multiplier (capped) when resources are abundant.
    pub fn adjust_concurrency(&self, snapshot: &EnvironmentSnapshot) {
        let current = self.max_concurrency.load(Ordering::Relaxed);
        let next = if snapshot.is_low_end_device
            || snapshot.network_class == stump_sensor::NetworkClass::Slow
        {
            (current / 2).max(1)
        } else if snapshot.is_abundant() {
            (current * self.config.boost_multiplier).min(self.config.max_concurrency_cap)
        } else {
            current
        };

        if next != current {
            self.max_concurrency.store(next, Ordering::Relaxed);
            debug!(from = current, to = next, "concurrency adjusted");
            self.telemetry.record(
                "queue.concurrency_adjusted",
                json!({ "from": current, "to": next }),
            );
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency.load(Ordering::Relaxed)
    }

    /// Current counters. Read-only and non-blocking.
    pub fn stats(&self) -> QueueStats {
        let inner = self.inner.lock().unwrap();
        let (completed, failed) = inner.units.values().fold((0, 0), |(ok, bad), unit| {
            match unit.state {
                LoadState::Loaded => (ok + 1, bad),
                LoadState::Failed => (ok, bad + 1),
                _ => (ok, bad),
            }
        });
        QueueStats {
            queued: inner.pending.len(),
            loading: inner.loading,
            completed,
            failed,
            max_concurrency: self.max_concurrency.load(Ordering::Relaxed),
        }
    }

    /// Snapshot of one unit's record.
    pub fn unit(&self, id: &str) -> Option<LoadUnit> {
        self.inner.lock().unwrap().units.get(id).cloned()
    }
}
