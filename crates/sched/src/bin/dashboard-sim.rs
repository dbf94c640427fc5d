//! dashboard-sim — simulated dashboard startup against the scheduler.
//!
//! Registers a handful of fake widgets across the four priority waves,
//! runs progressive loading, then wraps two lazy widgets and drives the
//! viewport observer by hand. Useful for eyeballing log output and
//! telemetry without a real frontend.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use stump_core::{load_dotenv, Category, Config, MemoryTelemetry, Priority};
use stump_sched::{
    LoadCoordinator, LoadFactory, LoadQueue, PriorityClassifier, ProgressiveLoader,
    ScenarioContext, WrapOptions,
};
use stump_sensor::{EnvironmentSensor, StaticProbe, ViewportObserver};

fn simulated_loader(label: &str, work_ms: u64) -> LoadFactory {
    let label = label.to_string();
    Arc::new(move || {
        let label = label.clone();
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(work_ms)).await;
            info!(widget = %label, "widget content resolved");
            Ok(())
        })
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let config = Config::from_env();
    config.log_summary();

    let telemetry = Arc::new(MemoryTelemetry::new());
    let sensor = Arc::new(EnvironmentSensor::new(Arc::new(StaticProbe::new())));
    let scenario = Arc::new(ScenarioContext::new(telemetry.clone()));
    scenario.set_scenario("rally")?;

    let classifier = Arc::new(PriorityClassifier::new(scenario, sensor.clone()));
    let queue = Arc::new(LoadQueue::new(config.queue.clone(), telemetry.clone()));
    queue.adjust_concurrency(&sensor.sample());

    // ── Progressive boot ────────────────────────────────────────────

    let loader = Arc::new(ProgressiveLoader::new(
        queue.clone(),
        config.waves.clone(),
        telemetry.clone(),
    ));
    loader.register("alert-stream", Priority::Critical, simulated_loader("alert-stream", 40))?;
    loader.register("quick-actions", Priority::Critical, simulated_loader("quick-actions", 25))?;
    loader.register("poll-tracker", Priority::Important, simulated_loader("poll-tracker", 80))?;
    loader.register("news-digest", Priority::Deferred, simulated_loader("news-digest", 60))?;
    loader.register("archive-sync", Priority::Background, simulated_loader("archive-sync", 120))?;

    loader.start_loading().await;
    info!(progress = ?loader.progress(), "critical wave done, dashboard interactive");

    while loader.is_running() {
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    info!(stats = ?queue.stats(), "all waves drained");

    // ── Lazy widgets below the fold ─────────────────────────────────

    let observer = Arc::new(ViewportObserver::new());
    let coordinator = LoadCoordinator::new(
        queue.clone(),
        classifier,
        observer.clone(),
        config.wrapper.clone(),
    );

    let handle = coordinator.wrap(
        "donor-heatmap",
        simulated_loader("donor-heatmap", 50),
        WrapOptions::new(Priority::Deferred, Category::Analytics),
    );

    // Simulate the user scrolling the widget into view.
    observer.report_intersection("donor-heatmap", 0.6);
    queue.process_queue().await;
    info!(state = ?handle.state(), "lazy widget after scroll");

    info!(events = telemetry.events().len(), "telemetry events recorded");
    Ok(())
}
