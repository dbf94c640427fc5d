//! Per-unit loading wrapper: decides *when* a unit moves from Pending to
//! Queued, based on effective priority, preload flags, visibility, and
//! fallback timers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use stump_core::{Category, LoadState, LoadUnit, Priority, WrapperConfig};
use stump_sensor::{ViewportObserver, VisibilityOptions};

use crate::classifier::PriorityClassifier;
use crate::error::SchedError;
use crate::queue::{LoadFactory, LoadFn, LoadQueue};

/// Declared scheduling parameters for a wrapped unit.
#[derive(Debug, Clone, Copy)]
pub struct WrapOptions {
    pub priority: Priority,
    pub category: Category,
    /// Trigger an Important unit immediately instead of waiting for
    /// visibility.
    pub preload: bool,
    /// The unit is already within the viewport at mount.
    pub visible: bool,
}

impl WrapOptions {
    pub fn new(priority: Priority, category: Category) -> Self {
        Self {
            priority,
            category,
            preload: false,
            visible: false,
        }
    }

    pub fn preload(mut self) -> Self {
        self.preload = true;
        self
    }

    pub fn visible(mut self) -> Self {
        self.visible = true;
        self
    }
}

/// Wires units into the queue with the trigger policy for their effective
/// priority.
pub struct LoadCoordinator {
    queue: Arc<LoadQueue>,
    classifier: Arc<PriorityClassifier>,
    observer: Arc<ViewportObserver>,
    config: WrapperConfig,
}

impl LoadCoordinator {
    pub fn new(
        queue: Arc<LoadQueue>,
        classifier: Arc<PriorityClassifier>,
        observer: Arc<ViewportObserver>,
        config: WrapperConfig,
    ) -> Self {
        Self {
            queue,
            classifier,
            observer,
            config,
        }
    }

    pub fn queue(&self) -> &Arc<LoadQueue> {
        &self.queue
    }

    pub fn observer(&self) -> &Arc<ViewportObserver> {
        &self.observer
    }

    /// Wrap a unit and arm its trigger. Must be called within a tokio
    /// runtime (Important fallback and Background delay use timers).
    ///
    /// Trigger policy on the classified effective priority:
    /// - Critical: immediately.
    /// - Important: immediately when preloaded or already visible,
    ///   otherwise on first visibility with an unconditional fallback
    ///   timer.
    /// - Deferred: visibility only.
    /// - Background: fixed delay, visibility ignored.
    pub fn wrap(&self, id: &str, loader: LoadFactory, opts: WrapOptions) -> LoadHandle {
        let effective = self.classifier.classify(opts.category, opts.priority);
        debug!(
            id,
            declared = %opts.priority,
            effective = %effective,
            "unit wrapped"
        );

        let shared = Arc::new(HandleShared {
            id: id.to_string(),
            effective,
            category: opts.category,
            queue: self.queue.clone(),
            observer: self.observer.clone(),
            loader,
            triggered: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            timers: Mutex::new(Vec::new()),
            hover_enabled: self.config.hover_trigger_enabled,
        });

        match effective {
            Priority::Critical => shared.trigger(),
            Priority::Important => {
                if opts.preload || opts.visible {
                    shared.trigger();
                } else {
                    self.observe_visibility(&shared);
                    self.arm_timer(&shared, self.config.important_fallback_ms);
                }
            }
            Priority::Deferred => {
                if opts.visible {
                    shared.trigger();
                } else {
                    self.observe_visibility(&shared);
                }
            }
            Priority::Background => {
                self.arm_timer(&shared, self.config.background_delay_ms);
            }
        }

        LoadHandle { shared }
    }

    fn observe_visibility(&self, shared: &Arc<HandleShared>) {
        let options =
            VisibilityOptions::default().widened_for(&self.classifier.sensor().sample());
        let trigger = shared.clone();
        self.observer
            .observe(&shared.id, options, move || trigger.trigger());
    }

    fn arm_timer(&self, shared: &Arc<HandleShared>, delay_ms: u64) {
        let trigger = shared.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            trigger.trigger();
        });
        shared.timers.lock().unwrap().push(handle);
    }
}

struct HandleShared {
    id: String,
    effective: Priority,
    category: Category,
    queue: Arc<LoadQueue>,
    observer: Arc<ViewportObserver>,
    loader: LoadFactory,
    triggered: AtomicBool,
    disposed: AtomicBool,
    timers: Mutex<Vec<JoinHandle<()>>>,
    hover_enabled: bool,
}

impl HandleShared {
    /// Move the unit Pending → Queued exactly once.
    fn trigger(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        if self.triggered.swap(true, Ordering::SeqCst) {
            return;
        }
        let loader = self.loader.clone();
        let load_fn: LoadFn = Box::new(move || loader());
        if let Err(err) = self
            .queue
            .enqueue(&self.id, load_fn, self.effective, self.category)
        {
            warn!(id = %self.id, error = %err, "trigger enqueue rejected");
        }
    }

    fn abort_timers(&self) {
        for timer in self.timers.lock().unwrap().drain(..) {
            timer.abort();
        }
    }
}

/// Handle to a wrapped loading unit. The consumer owns disposal.
pub struct LoadHandle {
    shared: Arc<HandleShared>,
}

impl LoadHandle {
    pub fn id(&self) -> &str {
        &self.shared.id
    }

    /// Priority the unit was classified at when wrapped.
    pub fn effective_priority(&self) -> Priority {
        self.shared.effective
    }

    /// Current lifecycle state; Pending until a trigger fires.
    pub fn state(&self) -> LoadState {
        if !self.shared.triggered.load(Ordering::SeqCst) {
            return LoadState::Pending;
        }
        self.shared
            .queue
            .unit(&self.shared.id)
            .map(|unit| unit.state)
            .unwrap_or(LoadState::Pending)
    }

    /// Full unit record, once the unit has been handed to the queue.
    pub fn unit(&self) -> Option<LoadUnit> {
        self.shared.queue.unit(&self.shared.id)
    }

    /// Pointer-intent signal: triggers Critical/Important units early.
    /// An optimization — a no-op for lower priorities or when disabled.
    pub fn notify_intent(&self) {
        if self.shared.hover_enabled && self.shared.effective <= Priority::Important {
            self.shared.trigger();
        }
    }

    /// Re-enter the queue at the same effective priority after a failure.
    /// The queue increments `retry_count`. Never called automatically.
    pub fn retry(&self) -> Result<(), SchedError> {
        match self.shared.queue.unit(&self.shared.id) {
            Some(unit) if unit.state == LoadState::Failed => {
                let loader = self.shared.loader.clone();
                let load_fn: LoadFn = Box::new(move || loader());
                self.shared.queue.enqueue(
                    &self.shared.id,
                    load_fn,
                    self.shared.effective,
                    self.shared.category,
                )
            }
            _ => Err(SchedError::NotFailed(self.shared.id.clone())),
        }
    }

    /// Tear the unit down: cancels a queued-but-unstarted task, visibility
    /// subscription and timers. Started work runs to completion and its
    /// result is discarded.
    pub fn dispose(&self) {
        self.shared.disposed.store(true, Ordering::SeqCst);
        self.shared.abort_timers();
        self.shared.observer.unobserve(&self.shared.id);
        if self.shared.queue.cancel(&self.shared.id) {
            debug!(id = %self.shared.id, "disposed before load started");
        }
    }
}

impl Drop for LoadHandle {
    fn drop(&mut self) {
        // Timers and visibility subscriptions must not outlive the handle;
        // queue-side cancellation stays explicit via dispose().
        self.shared.abort_timers();
        self.shared.observer.unobserve(&self.shared.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stump_core::QueueConfig;
    use stump_sensor::{EnvironmentSensor, StaticProbe};
    use stump_core::NoopTelemetry;

    use crate::scenario::ScenarioContext;

    fn coordinator() -> LoadCoordinator {
        coordinator_with_probe(StaticProbe::new())
    }

    fn coordinator_with_probe(probe: StaticProbe) -> LoadCoordinator {
        let queue = Arc::new(LoadQueue::new(
            QueueConfig::default(),
            Arc::new(NoopTelemetry),
        ));
        let classifier = Arc::new(PriorityClassifier::new(
            Arc::new(ScenarioContext::default()),
            Arc::new(EnvironmentSensor::new(Arc::new(probe))),
        ));
        LoadCoordinator::new(
            queue,
            classifier,
            Arc::new(ViewportObserver::new()),
            WrapperConfig::default(),
        )
    }

    fn ok_loader() -> LoadFactory {
        Arc::new(|| Box::pin(async { Ok(()) }))
    }

    fn failing_loader() -> LoadFactory {
        Arc::new(|| Box::pin(async { Err(crate::error::LoadError::Loader("nope".into())) }))
    }

    #[tokio::test]
    async fn critical_triggers_immediately() {
        let coord = coordinator();
        let handle = coord.wrap(
            "alerts",
            ok_loader(),
            WrapOptions::new(Priority::Critical, Category::Communication),
        );
        assert_eq!(handle.state(), LoadState::Queued);

        coord.queue().process_queue().await;
        assert_eq!(handle.state(), LoadState::Loaded);
    }

    #[tokio::test]
    async fn important_waits_for_visibility() {
        let coord = coordinator();
        let handle = coord.wrap(
            "polls",
            ok_loader(),
            WrapOptions::new(Priority::Important, Category::Analytics),
        );
        assert_eq!(handle.state(), LoadState::Pending);

        coord.observer().report_intersection("polls", 1.0);
        assert_eq!(handle.state(), LoadState::Queued);
    }

    #[tokio::test]
    async fn important_preload_skips_visibility() {
        let coord = coordinator();
        let handle = coord.wrap(
            "polls",
            ok_loader(),
            WrapOptions::new(Priority::Important, Category::Analytics).preload(),
        );
        assert_eq!(handle.state(), LoadState::Queued);
    }

    #[tokio::test]
    async fn important_already_visible_triggers_now() {
        let coord = coordinator();
        let handle = coord.wrap(
            "polls",
            ok_loader(),
            WrapOptions::new(Priority::Important, Category::Analytics).visible(),
        );
        assert_eq!(handle.state(), LoadState::Queued);
    }

    #[tokio::test(start_paused = true)]
    async fn important_fallback_fires_without_visibility() {
        let coord = coordinator();
        let handle = coord.wrap(
            "polls",
            ok_loader(),
            WrapOptions::new(Priority::Important, Category::Analytics),
        );
        assert_eq!(handle.state(), LoadState::Pending);

        // Past the fallback delay, the unit queues even though it was
        // never reported visible.
        tokio::time::sleep(Duration::from_millis(
            WrapperConfig::default().important_fallback_ms + 10,
        ))
        .await;
        assert_eq!(handle.state(), LoadState::Queued);
    }

    #[tokio::test(start_paused = true)]
    async fn deferred_has_no_fallback_timer() {
        let coord = coordinator();
        let handle = coord.wrap(
            "archive",
            ok_loader(),
            WrapOptions::new(Priority::Deferred, Category::General),
        );

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(handle.state(), LoadState::Pending);

        coord.observer().report_intersection("archive", 0.5);
        assert_eq!(handle.state(), LoadState::Queued);
    }

    #[tokio::test(start_paused = true)]
    async fn background_triggers_after_delay_ignoring_visibility() {
        let coord = coordinator();
        let handle = coord.wrap(
            "prefetch",
            ok_loader(),
            WrapOptions::new(Priority::Background, Category::General),
        );

        // Visibility has no effect on Background units.
        coord.observer().report_intersection("prefetch", 1.0);
        assert_eq!(handle.state(), LoadState::Pending);

        tokio::time::sleep(Duration::from_millis(
            WrapperConfig::default().background_delay_ms + 10,
        ))
        .await;
        assert_eq!(handle.state(), LoadState::Queued);
    }

    #[tokio::test]
    async fn intent_triggers_important_early() {
        let coord = coordinator();
        let handle = coord.wrap(
            "polls",
            ok_loader(),
            WrapOptions::new(Priority::Important, Category::Analytics),
        );
        assert_eq!(handle.state(), LoadState::Pending);

        handle.notify_intent();
        assert_eq!(handle.state(), LoadState::Queued);
    }

    #[tokio::test]
    async fn intent_is_noop_for_deferred() {
        let coord = coordinator();
        let handle = coord.wrap(
            "archive",
            ok_loader(),
            WrapOptions::new(Priority::Deferred, Category::General),
        );
        handle.notify_intent();
        assert_eq!(handle.state(), LoadState::Pending);
    }

    #[tokio::test]
    async fn retry_after_failure_reenters_queue() {
        let coord = coordinator();
        let handle = coord.wrap(
            "flaky",
            failing_loader(),
            WrapOptions::new(Priority::Critical, Category::General),
        );
        coord.queue().process_queue().await;
        assert_eq!(handle.state(), LoadState::Failed);

        handle.retry().unwrap();
        assert_eq!(handle.state(), LoadState::Queued);
        assert_eq!(handle.unit().unwrap().retry_count, 1);
    }

    #[tokio::test]
    async fn retry_rejected_unless_failed() {
        let coord = coordinator();
        let handle = coord.wrap(
            "fine",
            ok_loader(),
            WrapOptions::new(Priority::Critical, Category::General),
        );
        assert!(matches!(handle.retry(), Err(SchedError::NotFailed(_))));

        coord.queue().process_queue().await;
        assert_eq!(handle.state(), LoadState::Loaded);
        assert!(matches!(handle.retry(), Err(SchedError::NotFailed(_))));
    }

    #[tokio::test]
    async fn dispose_cancels_queued_unit() {
        let coord = coordinator();
        let handle = coord.wrap(
            "goner",
            ok_loader(),
            WrapOptions::new(Priority::Critical, Category::General),
        );
        assert_eq!(handle.state(), LoadState::Queued);

        handle.dispose();
        assert_eq!(handle.state(), LoadState::Pending);

        coord.queue().process_queue().await;
        assert_eq!(coord.queue().stats().completed, 0);
    }

    #[tokio::test]
    async fn dispose_blocks_later_triggers() {
        let coord = coordinator();
        let handle = coord.wrap(
            "gone",
            ok_loader(),
            WrapOptions::new(Priority::Important, Category::General),
        );
        handle.dispose();

        // Visibility subscription was cancelled; even a direct report
        // cannot revive the unit.
        coord.observer().report_intersection("gone", 1.0);
        assert_eq!(handle.state(), LoadState::Pending);
        assert_eq!(coord.observer().pending(), 0);
    }

    #[tokio::test]
    async fn low_end_demotion_changes_trigger_policy() {
        // On a low-end device an Important unit behaves as Deferred:
        // no fallback timer, visibility only.
        let coord = coordinator_with_probe(
            StaticProbe::new().with_memory(stump_sensor::MemoryClass::Low),
        );
        let handle = coord.wrap(
            "polls",
            ok_loader(),
            WrapOptions::new(Priority::Important, Category::Analytics),
        );
        assert_eq!(handle.effective_priority(), Priority::Deferred);
        assert_eq!(handle.state(), LoadState::Pending);

        coord.observer().report_intersection("polls", 1.0);
        assert_eq!(handle.state(), LoadState::Queued);
    }
}
