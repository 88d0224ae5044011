//! Command handlers
//!
//! Each handler assembles the engine components from configuration and runs
//! one mode. The engine itself never reads configuration or global state.

use crate::formatters;
use gsm_engine::domain::ports::{NotificationSink, RemoteContentSource, VersionStore};
use gsm_engine::domain::{plan, seed_store};
use gsm_engine::infrastructure::{
    FileVersionStore, LogNotificationSink, SteamRemoteSource, TokioServerExecutor,
    WebhookNotificationSink,
};
use gsm_engine::{
    Config, ProcessSupervisor, RecoveryController, RemoteStateProbe, Result, TickOptions,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

struct Components {
    store: Arc<dyn VersionStore>,
    source: Arc<dyn RemoteContentSource>,
    probe: RemoteStateProbe,
}

async fn build_components(config: &Config) -> Result<Components> {
    let store: Arc<dyn VersionStore> =
        Arc::new(FileVersionStore::open(config.state_file.as_str()).await?);
    let source: Arc<dyn RemoteContentSource> =
        Arc::new(SteamRemoteSource::new(config.remote.clone()));
    let probe = RemoteStateProbe::new(source.clone(), config.retry_policy());
    Ok(Components {
        store,
        source,
        probe,
    })
}

fn build_sink(config: &Config) -> Arc<dyn NotificationSink> {
    match config.notify.webhook_url {
        Some(ref url) => Arc::new(WebhookNotificationSink::new(
            url.clone(),
            config.notify.title.clone(),
            config.notify.retry_attempts,
        )),
        None => Arc::new(LogNotificationSink),
    }
}

async fn build_controller(config: &Config, dry_run: bool) -> Result<RecoveryController> {
    let components = build_components(config).await?;
    let supervisor = ProcessSupervisor::new(
        Arc::new(TokioServerExecutor::new()),
        config.spawn_config(),
        config.supervisor_timeouts(),
    );
    RecoveryController::new(
        config.subjects(),
        components.store,
        components.probe,
        components.source,
        supervisor,
        build_sink(config),
        TickOptions {
            dry_run: dry_run || config.dry_run,
        },
    )
}

/// Continuous supervision until SIGINT/SIGTERM.
pub async fn handle_run(
    config: Config,
    interval_sec: Option<u64>,
    dry_run: bool,
) -> Result<()> {
    let interval = interval_sec
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.poll_interval());
    info!(
        restart_policy_hint = %config.restart_policy(),
        "starting supervision"
    );

    let mut controller = build_controller(&config, dry_run).await?;

    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone());

    controller.run(interval, shutdown).await;
    Ok(())
}

/// One tick, then exit.
pub async fn handle_once(config: Config, dry_run: bool) -> Result<()> {
    let mut controller = build_controller(&config, dry_run).await?;
    let report = controller.tick().await;
    println!("{}", formatters::format_report(&report));
    Ok(())
}

/// Reconcile only: print the plan, touch nothing.
pub async fn handle_plan(config: Config) -> Result<()> {
    let components = build_components(&config).await?;
    let subjects = config.subjects();

    let local = components.store.all().await?;
    let probed = components.probe.fetch(&subjects).await;
    for (subject, err) in &probed.failures {
        eprintln!("warning: {} skipped: {}", subject, err);
    }

    let plan = plan(&subjects, &local, &probed.versions);
    print!("{}", formatters::format_plan(&plan));
    Ok(())
}

/// Record current remote versions as applied.
pub async fn handle_seed(config: Config) -> Result<()> {
    if config.dry_run {
        return Err(gsm_engine::DomainError::Config(
            "refusing to seed while dry_run is set".to_string(),
        ));
    }
    let components = build_components(&config).await?;
    let subjects = config.subjects();

    let summary = seed_store(components.store.as_ref(), &components.probe, &subjects).await?;
    println!(
        "seeded {} of {} subjects",
        summary.recorded.len(),
        subjects.len()
    );
    for subject in &summary.failed {
        println!("  unresolved: {}", subject);
    }
    Ok(())
}

fn spawn_signal_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("termination signal received");
        shutdown.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(_) => return std::future::pending().await,
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
