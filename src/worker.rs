// Background poller: one scheduler for every device.
// Each tick spawns a refresh (fan-out reads, fan-in, one aggregation pass) so a slow store
// never holds up the next tick; out-of-order refreshes are dropped by the registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinSet;
use tokio::time::{Duration, Instant, interval};
use tracing::{Instrument, instrument};

use crate::aggregation::build_snapshot;
use crate::history::SnapshotHistory;
use crate::models::DashboardSnapshot;
use crate::registry::DeviceRegistry;
use crate::store::DeviceStore;
use crate::valve::ValveController;

/// Rate limit for "no receivers" log (avoid logging every tick when no one is on /ws/dashboard)
const NO_RECEIVERS_WARN_INTERVAL: Duration = Duration::from_secs(60);

/// Counters shared with the stats log and tests.
#[derive(Debug, Default)]
pub struct PollerStats {
    pub ticks: AtomicU64,
    pub snapshots_published: AtomicU64,
    pub refreshes_dropped: AtomicU64,
    pub failed_reads: AtomicU64,
}

/// Everything one refresh pass needs; cloned into each spawned pass.
pub struct Pipeline {
    pub registry: Arc<DeviceRegistry>,
    pub store: Arc<dyn DeviceStore>,
    pub history: Arc<SnapshotHistory>,
    pub tx: broadcast::Sender<DashboardSnapshot>,
    pub stats: Arc<PollerStats>,
    /// Opens valves in critical zones after each publish when set.
    pub auto_watering: Option<Arc<ValveController>>,
}

impl Pipeline {
    /// Runs one refresh for `generation`, then aggregates and publishes.
    /// Returns `None` when a newer generation was already published.
    pub async fn poll_once(
        &self,
        generation: u64,
        reload_devices: bool,
    ) -> Option<DashboardSnapshot> {
        let store = self.store.as_ref();
        if reload_devices || self.registry.snapshot().await.devices.is_empty() {
            match self.registry.reload_devices(store).await {
                Ok(n) => tracing::debug!(
                    operation = "reload_devices",
                    devices = n,
                    "device list reloaded"
                ),
                Err(e) => tracing::warn!(
                    error = %e,
                    operation = "reload_devices",
                    "device list reload failed; keeping current roster"
                ),
            }
        }

        let outcome = self.registry.refresh_generation(store, generation).await;
        self.stats
            .failed_reads
            .fetch_add(outcome.failed_reads as u64, Ordering::Relaxed);
        if !outcome.published {
            self.stats.refreshes_dropped.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let snapshot = build_snapshot(
            &outcome.snapshot.devices,
            generation,
            outcome.snapshot.refreshed_at,
        );
        let accepted = self
            .history
            .push_then(snapshot.clone(), |s| {
                // No receivers is normal when no dashboard is open.
                let _ = self.tx.send(s.clone());
            })
            .await;
        if !accepted {
            tracing::debug!(generation, "newer snapshot already published; dropping");
            self.stats.refreshes_dropped.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        self.stats.snapshots_published.fetch_add(1, Ordering::Relaxed);

        if let Some(valves) = &self.auto_watering {
            valves
                .auto_water(&snapshot.zones, &outcome.snapshot.devices)
                .await;
        }
        Some(snapshot)
    }
}

/// Shared state and shutdown for the poller.
pub struct PollerDeps {
    pub pipeline: Arc<Pipeline>,
    pub ws_dashboard_connections: Arc<AtomicUsize>,
    pub shutdown_rx: oneshot::Receiver<()>,
}

/// Poller timing and logging config.
pub struct PollerConfig {
    pub interval_ms: u64,
    pub device_list_every_ticks: u64,
    /// How often to log app stats (real seconds).
    pub stats_log_interval_secs: u64,
}

/// Reload on the first tick and then every `every` ticks.
pub fn is_reload_tick(generation: u64, every: u64) -> bool {
    every <= 1 || generation % every == 1
}

pub fn spawn(deps: PollerDeps, config: PollerConfig) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run(deps, config))
}

#[instrument(skip_all, fields(interval_ms = config.interval_ms))]
async fn run(deps: PollerDeps, config: PollerConfig) {
    let PollerDeps {
        pipeline,
        ws_dashboard_connections,
        mut shutdown_rx,
    } = deps;

    let mut tick = interval(Duration::from_millis(config.interval_ms));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut stats_log_tick = interval(Duration::from_secs(config.stats_log_interval_secs));
    stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut inflight: JoinSet<()> = JoinSet::new();
    let mut last_no_receivers_warn: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let generation = pipeline.registry.next_generation();
                pipeline.stats.ticks.fetch_add(1, Ordering::Relaxed);
                let reload = is_reload_tick(generation, config.device_list_every_ticks);
                if !inflight.is_empty() {
                    tracing::debug!(
                        generation,
                        inflight = inflight.len(),
                        "previous refreshes still running; issuing tick anyway"
                    );
                }
                let pass = pipeline.clone();
                inflight.spawn(
                    async move {
                        pass.poll_once(generation, reload).await;
                    }
                    .in_current_span(),
                );

                if pipeline.tx.receiver_count() == 0 {
                    let should_warn = last_no_receivers_warn
                        .is_none_or(|t| t.elapsed() >= NO_RECEIVERS_WARN_INTERVAL);
                    if should_warn {
                        tracing::debug!(
                            operation = "broadcast_snapshot",
                            "No active WebSocket clients; broadcast channel has no receivers"
                        );
                        last_no_receivers_warn = Some(Instant::now());
                    }
                }
            }
            Some(result) = inflight.join_next(), if !inflight.is_empty() => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, operation = "poll_once", "refresh task failed");
                }
            }
            _ = &mut shutdown_rx => {
                tracing::debug!(inflight = inflight.len(), "Poller shutting down");
                inflight.abort_all();
                break;
            }
            _ = stats_log_tick.tick() => {
                let stats = &pipeline.stats;
                tracing::info!(
                    ws_dashboard_clients = ws_dashboard_connections.load(Ordering::Relaxed),
                    ticks = stats.ticks.load(Ordering::Relaxed),
                    snapshots_published = stats.snapshots_published.load(Ordering::Relaxed),
                    refreshes_dropped = stats.refreshes_dropped.load(Ordering::Relaxed),
                    failed_reads = stats.failed_reads.load(Ordering::Relaxed),
                    "app stats"
                );
            }
        }
    }
}
