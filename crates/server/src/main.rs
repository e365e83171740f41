mod api;
mod router;
mod state;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::info;

use pagewatch_capture::{HttpCaptureProvider, LivenessProbe};
use pagewatch_core::{Config, LocalClock, PlanLimits};
use pagewatch_engine::{CheckRunner, InflightRegistry, QuotaGuard, Scheduler};
use pagewatch_notify::{Dispatcher, JsonNotificationHistory, JsonSettingsSource};
use pagewatch_store::{
    JsonCheckLedger, JsonQuotaStore, JsonScheduleStore, JsonTargetStore, ObjectArtifactStore,
    StaticPlanSource,
};

use crate::state::AppState;

fn load_config() -> Config {
    pagewatch_core::config::load_dotenv();
    Config::from_env()
}

fn build_state(config: Config) -> anyhow::Result<Arc<AppState>> {
    let data_dir = &config.artifacts.data_dir;
    std::fs::create_dir_all(data_dir)?;

    let targets = Arc::new(JsonTargetStore::open(data_dir)?);
    let schedules = Arc::new(JsonScheduleStore::open(data_dir)?);
    let ledger = Arc::new(JsonCheckLedger::open(data_dir)?);
    let quotas = Arc::new(JsonQuotaStore::open(data_dir)?);
    let artifacts = Arc::new(ObjectArtifactStore::from_config(&config.artifacts)?);

    // Plan limits come from the external billing system; until that
    // integration lands every owner gets the default plan.
    let plans = Arc::new(StaticPlanSource::new(PlanLimits::default()));

    let capture = Arc::new(HttpCaptureProvider::from_config(&config.capture)?);
    let liveness = Arc::new(LivenessProbe::new(config.capture.liveness_timeout_secs)?);

    let history = Arc::new(JsonNotificationHistory::open(
        data_dir.join("deliveries.json"),
    )?);
    let settings = Arc::new(JsonSettingsSource::open(
        &data_dir.join("notification_settings.json"),
    )?);
    let dispatcher = Arc::new(Dispatcher::new(history.clone()));

    let runner = Arc::new(CheckRunner::new(
        capture,
        liveness,
        artifacts,
        ledger.clone(),
        dispatcher,
        settings,
        InflightRegistry::new(),
    ));

    let clock = LocalClock::from_offset_hours(config.scheduler.utc_offset_hours);
    let scheduler = Arc::new(Scheduler::new(
        schedules.clone(),
        targets.clone(),
        runner.clone(),
        clock,
        config.scheduler.tick_minutes,
    ));
    let quota = Arc::new(QuotaGuard::new(quotas, plans.clone()));

    Ok(Arc::new(AppState {
        config,
        clock,
        targets,
        schedules,
        ledger,
        plans,
        notification_history: history,
        runner,
        scheduler,
        quota,
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let config = load_config();
    config.log_summary();
    let tick_minutes = config.scheduler.tick_minutes;
    let state = build_state(config)?;

    // Internal tick timer. The first tick fires immediately, which is
    // also what catches up schedules that came due while the process
    // was down.
    let scheduler = state.scheduler.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(tick_minutes as u64 * 60));
        loop {
            interval.tick().await;
            match scheduler.run_due(Utc::now()).await {
                Ok(summary) => {
                    if summary.fired > 0 || summary.re_anchored > 0 {
                        info!(
                            fired = summary.fired,
                            re_anchored = summary.re_anchored,
                            "scheduler tick"
                        );
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "scheduler tick failed");
                }
            }
        }
    });

    let app = router::build_router(state.clone());
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("pagewatch listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
