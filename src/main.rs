//! Moogie live sync - Entry Point
//!
//! Restores the dashboard views for the configured date range, keeps them in
//! sync with the push channel and logs every change until shut down.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use moogie::api::{ApiClient, UpstreamApi};
use moogie::config::LogConfig;
use moogie::date_range::{format_instant, DateRangeController, SystemClock};
use moogie::format::{format_duration, SuccessBand};
use moogie::location::UrlLocation;
use moogie::store::{
    CacheState, DashboardStore, DashboardView, JobDetail, JobDetailStore, JobEntry, JobsStore,
};
use moogie::sync::{
    bootstrap, ConnectionManager, ConnectionState, MessageDispatcher, SyncTargets,
    WebSocketTransport,
};
use moogie::{Config, Result};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;
    init_tracing(&config.log);

    info!("Starting Moogie live sync");
    info!(
        api = %config.api.base_url,
        channel = %config.channel.url,
        "Configuration loaded"
    );

    let api = Arc::new(ApiClient::new(&config.api)?);
    match api.health_check().await {
        Ok(health) => info!(status = %health.status, "Upstream API reachable"),
        Err(e) => warn!("Upstream health check failed: {} (continuing)", e),
    }

    // Views share the upstream client and the date range
    let location = Arc::new(UrlLocation::new(config.view.location.clone()));
    let range = Arc::new(DateRangeController::new(location.clone(), Arc::new(SystemClock)));
    let upstream: Arc<dyn UpstreamApi> = api;
    let targets = SyncTargets {
        range: range.clone(),
        jobs: Arc::new(JobsStore::new(upstream.clone())),
        dashboard: Arc::new(DashboardStore::new(upstream.clone())),
        job_detail: Arc::new(JobDetailStore::new(upstream)),
    };

    let mut jobs_rx = targets.jobs.subscribe();
    let mut dashboard_rx = targets.dashboard.subscribe();
    let mut detail_rx = targets.job_detail.subscribe();

    fetch_views(&targets, &config).await;

    // Start live sync
    let dispatcher = Arc::new(MessageDispatcher::new());
    let connection = ConnectionManager::new(
        Arc::new(WebSocketTransport),
        dispatcher,
        config.channel.policy(),
    );
    let mut state_rx = connection.subscribe_state();
    let mut sync = bootstrap::start(&connection, &config.channel.url, targets.clone());

    let mut ticker = tokio::time::interval(Duration::from_secs(config.view.live_tick_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
            _ = ticker.tick() => {
                if range.update_to_if_live() {
                    debug!(to = %format_instant(range.current().to), "Live range advanced");
                }
            }
            Ok(()) = state_rx.changed() => {
                let state = *state_rx.borrow_and_update();
                log_connection_state(state, connection.reconnect_attempts());
            }
            Ok(()) = jobs_rx.changed() => {
                log_jobs(&jobs_rx.borrow_and_update());
            }
            Ok(()) = dashboard_rx.changed() => {
                log_dashboard(&dashboard_rx.borrow_and_update());
            }
            Ok(()) = detail_rx.changed() => {
                log_job_detail(&detail_rx.borrow_and_update());
            }
        }
    }

    sync.teardown();
    targets.jobs.reset();
    targets.dashboard.reset();
    targets.job_detail.reset();
    info!(location = %location.href(), "Moogie live sync stopped");
    Ok(())
}

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("moogie={}", log.level).into());
    let registry = tracing_subscriber::registry().with(filter);

    if log.format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Initial reads for the active range
async fn fetch_views(targets: &SyncTargets, config: &Config) {
    let range = targets.range.current();
    info!(
        from = %format_instant(range.from),
        to = %format_instant(range.to),
        live = range.is_to_date_live,
        "Fetching views"
    );

    let detail = async {
        if let Some(id) = config.view.job_id {
            targets
                .job_detail
                .fetch_job(id, &range, config.view.job_history_limit)
                .await;
        }
    };

    tokio::join!(
        targets.jobs.fetch_jobs(&range),
        targets.dashboard.fetch_summary(&range),
        detail
    );
}

fn log_connection_state(state: ConnectionState, attempts: u32) {
    match state {
        ConnectionState::Error => warn!(attempts, "Push channel in error state"),
        ConnectionState::Connected => info!("Push channel live"),
        state => debug!(%state, attempts, "Push channel state"),
    }
}

fn log_jobs(state: &CacheState<Vec<JobEntry>>) {
    if let Some(error) = &state.error {
        warn!(status = ?error.status, "Jobs unavailable: {}", error.message);
        return;
    }
    let Some(entries) = &state.data else {
        return;
    };

    for entry in entries {
        debug!(
            id = entry.job.id,
            name = %entry.job.name,
            enabled = entry.job.enabled,
            success_rate = entry.job.success_rate,
            band = %SuccessBand::for_rate(entry.job.success_rate),
            avg_response = %format_duration(entry.job.avg_response_time),
            recent = entry.recent.len(),
            "Job"
        );
    }
    info!(jobs = entries.len(), "Jobs view updated");
}

fn log_dashboard(state: &CacheState<DashboardView>) {
    if let Some(error) = &state.error {
        warn!(status = ?error.status, "Dashboard unavailable: {}", error.message);
        return;
    }
    let Some(view) = &state.data else {
        return;
    };

    let summary = &view.summary;
    info!(
        total_jobs = summary.total_jobs,
        active_jobs = summary.active_jobs,
        overall_success_rate = summary.overall_success_rate,
        band = %SuccessBand::for_rate(summary.overall_success_rate),
        total_executions = summary.total_executions,
        "Dashboard view updated"
    );
}

fn log_job_detail(state: &CacheState<JobDetail>) {
    if let Some(error) = &state.error {
        warn!(status = ?error.status, "Job detail unavailable: {}", error.message);
        return;
    }
    let Some(detail) = &state.data else {
        return;
    };

    let job = detail.job();
    info!(
        id = job.id,
        name = %job.name,
        history = detail.history.len(),
        recent = detail.entry.recent.len(),
        success_rate = job.success_rate,
        band = %SuccessBand::for_rate(job.success_rate),
        last_status = ?detail.entry.recent.newest().map(|e| e.status.as_str()),
        "Job detail view updated"
    );
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
