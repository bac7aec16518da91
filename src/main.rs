use anyhow::{Context, Result};
use farmwatch::config::{AppConfig, StoreKind};
use farmwatch::store::{DeviceStore, MemoryStore, RtdbClient};
use farmwatch::*;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

fn build_store(config: &AppConfig) -> Result<Arc<dyn DeviceStore>> {
    let store = &config.store;
    match store.kind {
        StoreKind::Rtdb => {
            let client = RtdbClient::new(
                &store.base_url,
                &store.uid,
                store.auth_token.clone(),
                Duration::from_millis(store.request_timeout_ms),
            )?;
            tracing::info!(base_url = %store.base_url, uid = %store.uid, "using realtime store");
            Ok(Arc::new(client))
        }
        StoreKind::Memory => {
            let memory = match &store.seed_path {
                Some(path) => {
                    let raw = std::fs::read_to_string(path)
                        .with_context(|| format!("reading store.seed_path {path}"))?;
                    let tree: serde_json::Value = serde_json::from_str(&raw)?;
                    MemoryStore::from_json_tree(&tree)?
                }
                None => MemoryStore::new(),
            };
            tracing::info!(seed = ?store.seed_path, "using in-memory store");
            Ok(Arc::new(memory))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = AppConfig::load()?;
    let (tx, _) =
        broadcast::channel::<models::DashboardSnapshot>(app_config.publishing.broadcast_capacity);

    let store = build_store(&app_config)?;
    let registry = Arc::new(registry::DeviceRegistry::new());
    let history = Arc::new(history::SnapshotHistory::new(
        app_config.polling.history_capacity,
    ));
    let valves = Arc::new(valve::ValveController::new(store.clone()));

    let ws_dashboard_connections = Arc::new(AtomicUsize::new(0));
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let pipeline = Arc::new(worker::Pipeline {
        registry: registry.clone(),
        store,
        history: history.clone(),
        tx: tx.clone(),
        stats: Arc::new(worker::PollerStats::default()),
        auto_watering: app_config
            .automation
            .auto_watering
            .then(|| valves.clone()),
    });
    let poller_handle = worker::spawn(
        worker::PollerDeps {
            pipeline,
            ws_dashboard_connections: ws_dashboard_connections.clone(),
            shutdown_rx,
        },
        worker::PollerConfig {
            interval_ms: app_config.polling.interval_ms,
            device_list_every_ticks: app_config.polling.device_list_every_ticks,
            stats_log_interval_secs: app_config.polling.stats_log_interval_secs,
        },
    );

    let app = routes::app(tx, registry, history, valves, ws_dashboard_connections);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
            let _ = poller_handle.await;
        }
    }

    Ok(())
}
