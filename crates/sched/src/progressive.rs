//! Progressive wave loading.
//!
//! Tasks are registered into priority waves and executed through the
//! [`LoadQueue`]. Only the Critical wave gates the caller: it is awaited
//! to completion before `start_loading` returns. The Important wave is
//! launched without blocking, and the Deferred/Background waves are
//! scheduled on fixed delays from the Important wave's start, whether or
//! not Important has finished.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use stump_core::{Category, NoopTelemetry, Priority, TelemetrySink, WaveConfig};

use crate::error::SchedError;
use crate::queue::{LoadFactory, LoadFn, LoadQueue};

struct WaveTask {
    id: String,
    loader: LoadFactory,
}

#[derive(Default)]
struct Progress {
    total: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

/// Aggregate progress across all waves of the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WaveProgress {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
}

impl WaveProgress {
    /// Settled fraction in percent (100 when nothing was registered).
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        (((self.completed + self.failed) * 100) / self.total) as u8
    }

    pub fn is_done(&self) -> bool {
        self.completed + self.failed >= self.total
    }
}

/// Orchestrates named-priority waves over a batch of registered tasks.
pub struct ProgressiveLoader {
    queue: Arc<LoadQueue>,
    config: WaveConfig,
    telemetry: Arc<dyn TelemetrySink>,
    waves: Mutex<BTreeMap<Priority, Vec<WaveTask>>>,
    running: AtomicBool,
    outstanding_waves: AtomicUsize,
    progress: Arc<Progress>,
    // Correlates the telemetry of one run; regenerated per start.
    run_id: Mutex<Uuid>,
}

impl ProgressiveLoader {
    pub fn new(queue: Arc<LoadQueue>, config: WaveConfig, telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self {
            queue,
            config,
            telemetry,
            waves: Mutex::new(BTreeMap::new()),
            running: AtomicBool::new(false),
            outstanding_waves: AtomicUsize::new(0),
            progress: Arc::new(Progress::default()),
            run_id: Mutex::new(Uuid::nil()),
        }
    }

    pub fn with_defaults(queue: Arc<LoadQueue>) -> Self {
        Self::new(queue, WaveConfig::default(), Arc::new(NoopTelemetry))
    }

    /// Add a task to its priority wave. Rejected while a run is active.
    pub fn register(
        &self,
        id: &str,
        priority: Priority,
        loader: LoadFactory,
    ) -> Result<(), SchedError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(SchedError::RunInProgress);
        }
        self.waves
            .lock()
            .unwrap()
            .entry(priority)
            .or_default()
            .push(WaveTask {
                id: id.to_string(),
                loader,
            });
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Aggregate progress of the current (or last) run.
    pub fn progress(&self) -> WaveProgress {
        WaveProgress {
            total: self.progress.total.load(Ordering::SeqCst),
            completed: self.progress.completed.load(Ordering::SeqCst),
            failed: self.progress.failed.load(Ordering::SeqCst),
        }
    }

    /// Execute the registered waves. Awaits the Critical wave; launches
    /// the rest in the background. Idempotent no-op while a run is in
    /// progress.
    pub async fn start_loading(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("wave run already in progress; ignoring");
            return;
        }

        let mut waves = std::mem::take(&mut *self.waves.lock().unwrap());
        let total: usize = waves.values().map(Vec::len).sum();
        self.progress.total.store(total, Ordering::SeqCst);
        self.progress.completed.store(0, Ordering::SeqCst);
        self.progress.failed.store(0, Ordering::SeqCst);

        let run_id = Uuid::new_v4();
        *self.run_id.lock().unwrap() = run_id;

        info!(%run_id, total, "progressive loading started");

        // Critical gates perceived readiness: run it to completion first.
        let critical = waves.remove(&Priority::Critical).unwrap_or_default();
        self.run_wave(Priority::Critical, critical).await;

        let important = waves.remove(&Priority::Important).unwrap_or_default();
        let deferred = waves.remove(&Priority::Deferred).unwrap_or_default();
        let background = waves.remove(&Priority::Background).unwrap_or_default();

        // Three background waves; the last one to settle closes the run.
        self.outstanding_waves.store(3, Ordering::SeqCst);

        let this = self.clone();
        tokio::spawn(async move {
            this.run_wave(Priority::Important, important).await;
            this.wave_done();
        });

        let this = self.clone();
        let delay = Duration::from_millis(self.config.deferred_delay_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.run_wave(Priority::Deferred, deferred).await;
            this.wave_done();
        });

        let this = self.clone();
        let delay = Duration::from_millis(self.config.background_delay_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.run_wave(Priority::Background, background).await;
            this.wave_done();
        });
    }

    async fn run_wave(&self, priority: Priority, tasks: Vec<WaveTask>) {
        if tasks.is_empty() {
            return;
        }
        debug!(wave = %priority, count = tasks.len(), "wave starting");

        for task in tasks {
            let progress = self.progress.clone();
            let loader = task.loader.clone();
            let load_fn: LoadFn = Box::new(move || {
                Box::pin(async move {
                    let result = loader().await;
                    match &result {
                        Ok(()) => progress.completed.fetch_add(1, Ordering::SeqCst),
                        Err(_) => progress.failed.fetch_add(1, Ordering::SeqCst),
                    };
                    result
                })
            });
            if let Err(err) = self
                .queue
                .enqueue(&task.id, load_fn, priority, Category::General)
            {
                warn!(id = %task.id, error = %err, "wave enqueue rejected");
            }
        }

        self.queue.process_queue().await;
    }

    fn wave_done(&self) {
        if self.outstanding_waves.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.running.store(false, Ordering::SeqCst);
            let progress = self.progress();
            let run_id = *self.run_id.lock().unwrap();
            info!(
                %run_id,
                completed = progress.completed,
                failed = progress.failed,
                "progressive loading finished"
            );
            self.telemetry.record(
                "waves.completed",
                json!({
                    "runId": run_id,
                    "total": progress.total,
                    "completed": progress.completed,
                    "failed": progress.failed,
                }),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use stump_core::MemoryTelemetry;

    fn loader_logging(id: &str, log: Arc<Mutex<Vec<String>>>) -> LoadFactory {
        let id = id.to_string();
        Arc::new(move || {
            let id = id.clone();
            let log = log.clone();
            Box::pin(async move {
                log.lock().unwrap().push(id);
                Ok(())
            })
        })
    }

    fn loader_failing() -> LoadFactory {
        Arc::new(|| Box::pin(async { Err(LoadError::Loader("down".into())) }))
    }

    async fn settle(loader: &Arc<ProgressiveLoader>) {
        // Paused-clock runs: sleeping drives the delayed waves forward.
        while loader.is_running() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn critical_wave_completes_before_start_returns() {
        let queue = Arc::new(LoadQueue::with_defaults());
        let loader = Arc::new(ProgressiveLoader::with_defaults(queue.clone()));
        let log = Arc::new(Mutex::new(Vec::new()));

        loader
            .register("boot", Priority::Critical, loader_logging("boot", log.clone()))
            .unwrap();
        loader
            .register("later", Priority::Important, loader_logging("later", log.clone()))
            .unwrap();

        loader.start_loading().await;

        // The Critical task has settled by the time the call returns;
        // the Important wave may or may not have started yet.
        assert!(log.lock().unwrap().contains(&"boot".to_string()));
        assert_eq!(queue.unit("boot").unwrap().state, stump_core::LoadState::Loaded);

        settle(&loader).await;
        assert_eq!(*log.lock().unwrap(), vec!["boot", "later"]);
    }

    #[tokio::test(start_paused = true)]
    async fn waves_execute_in_priority_order() {
        let queue = Arc::new(LoadQueue::with_defaults());
        let loader = Arc::new(ProgressiveLoader::with_defaults(queue));
        let log = Arc::new(Mutex::new(Vec::new()));

        loader
            .register("bg", Priority::Background, loader_logging("bg", log.clone()))
            .unwrap();
        loader
            .register("def", Priority::Deferred, loader_logging("def", log.clone()))
            .unwrap();
        loader
            .register("imp", Priority::Important, loader_logging("imp", log.clone()))
            .unwrap();
        loader
            .register("crit", Priority::Critical, loader_logging("crit", log.clone()))
            .unwrap();

        loader.start_loading().await;
        settle(&loader).await;

        assert_eq!(*log.lock().unwrap(), vec!["crit", "imp", "def", "bg"]);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_counts_completions_and_failures() {
        let queue = Arc::new(LoadQueue::with_defaults());
        let loader = Arc::new(ProgressiveLoader::with_defaults(queue));
        let log = Arc::new(Mutex::new(Vec::new()));

        loader
            .register("good", Priority::Critical, loader_logging("good", log.clone()))
            .unwrap();
        loader.register("bad", Priority::Important, loader_failing()).unwrap();

        loader.start_loading().await;
        settle(&loader).await;

        let progress = loader.progress();
        assert_eq!(progress.total, 2);
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.failed, 1);
        assert_eq!(progress.percent(), 100);
        assert!(progress.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent_while_running() {
        let queue = Arc::new(LoadQueue::with_defaults());
        let sink = Arc::new(MemoryTelemetry::new());
        let loader = Arc::new(ProgressiveLoader::new(
            queue,
            WaveConfig::default(),
            sink.clone(),
        ));
        let log = Arc::new(Mutex::new(Vec::new()));

        loader
            .register("only", Priority::Critical, loader_logging("only", log.clone()))
            .unwrap();

        loader.start_loading().await;
        assert!(loader.is_running());

        // Second call while waves are pending: ignored, nothing re-runs.
        loader.start_loading().await;
        settle(&loader).await;

        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(sink.count("waves.completed"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn register_rejected_while_running() {
        let queue = Arc::new(LoadQueue::with_defaults());
        let loader = Arc::new(ProgressiveLoader::with_defaults(queue));
        loader
            .register("x", Priority::Critical, Arc::new(|| Box::pin(async { Ok(()) })))
            .unwrap();

        loader.start_loading().await;
        let err = loader
            .register("y", Priority::Critical, Arc::new(|| Box::pin(async { Ok(()) })))
            .unwrap_err();
        assert!(matches!(err, SchedError::RunInProgress));

        settle(&loader).await;
    }

    #[tokio::test(start_paused = true)]
    async fn empty_run_finishes_immediately() {
        let queue = Arc::new(LoadQueue::with_defaults());
        let loader = Arc::new(ProgressiveLoader::with_defaults(queue));

        loader.start_loading().await;
        settle(&loader).await;

        assert_eq!(loader.progress().percent(), 100);
        assert!(!loader.is_running());
    }
}
