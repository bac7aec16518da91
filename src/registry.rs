// Device registry: immutable snapshots of the user's devices and their latest readings.
// A refresh fans out one read per device, fans the results in, and swaps in a new snapshot.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::{Device, DeviceType, SensorReading, now_ms};
use crate::store::DeviceStore;

/// Devices (sorted by id) as of one refresh.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    /// Tick that produced this snapshot; 0 before the first refresh.
    pub generation: u64,
    pub refreshed_at: u64,
    pub devices: Vec<Device>,
}

impl RegistrySnapshot {
    pub fn device(&self, device_id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.device_id == device_id)
    }
}

/// Result of one refresh pass.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub snapshot: Arc<RegistrySnapshot>,
    /// False when a newer generation had already been published; `snapshot` is then the newer one.
    pub published: bool,
    pub failed_reads: usize,
}

enum ReadResult {
    Sensor(Result<SensorReading, StoreError>, u64),
    Camera(Result<serde_json::Value, StoreError>),
    Skipped,
}

#[derive(Default)]
pub struct DeviceRegistry {
    current: RwLock<Arc<RegistrySnapshot>>,
    generation: AtomicU64,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current.read().await.clone()
    }

    /// Allocates the generation number for the next refresh.
    pub fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Re-reads the device list. Known devices keep their readings; vanished ones are dropped.
    /// On failure the current roster stays in place.
    pub async fn reload_devices(&self, store: &dyn DeviceStore) -> Result<usize, StoreError> {
        let listed = store.list_devices().await?;
        let mut current = self.current.write().await;
        let previous: HashMap<&str, &Device> = current
            .devices
            .iter()
            .map(|d| (d.device_id.as_str(), d))
            .collect();
        let devices: Vec<Device> = listed
            .into_iter()
            .map(|mut d| {
                if let Some(prev) = previous.get(d.device_id.as_str()) {
                    d.sensor_data = prev.sensor_data.clone();
                    d.last_update = prev.last_update;
                    d.camera_feeds = prev.camera_feeds.clone();
                }
                d
            })
            .collect();
        let count = devices.len();
        let (generation, refreshed_at) = (current.generation, current.refreshed_at);
        *current = Arc::new(RegistrySnapshot {
            generation,
            refreshed_at,
            devices,
        });
        Ok(count)
    }

    /// Refreshes every device under a fresh generation number.
    pub async fn refresh(&self, store: &dyn DeviceStore) -> Arc<RegistrySnapshot> {
        let generation = self.next_generation();
        self.refresh_generation(store, generation).await.snapshot
    }

    /// Reads all devices concurrently, then publishes unless a newer generation got there first.
    /// The published list is the roster current at publish time: devices dropped by a reload
    /// while reads were in flight stay dropped. A failed read keeps that device's previous reading.
    pub async fn refresh_generation(
        &self,
        store: &dyn DeviceStore,
        generation: u64,
    ) -> RefreshOutcome {
        let roster = self.snapshot().await;
        let results = join_all(roster.devices.iter().map(|d| read_device(store, d))).await;
        let mut by_id: HashMap<&str, ReadResult> = roster
            .devices
            .iter()
            .map(|d| d.device_id.as_str())
            .zip(results)
            .collect();

        let mut current = self.current.write().await;
        if current.generation > generation {
            debug!(
                generation,
                newer = current.generation,
                "dropping out-of-order refresh"
            );
            return RefreshOutcome {
                snapshot: current.clone(),
                published: false,
                failed_reads: 0,
            };
        }

        let mut failed_reads = 0;
        let mut devices = Vec::with_capacity(current.devices.len());
        for device in &current.devices {
            let mut next = device.clone();
            // Devices added by a reload after the reads started have no result yet.
            match by_id.remove(device.device_id.as_str()) {
                Some(ReadResult::Sensor(Ok(reading), at)) => {
                    next.sensor_data = Some(reading);
                    next.last_update = Some(at);
                }
                Some(ReadResult::Camera(Ok(feeds))) => next.camera_feeds = Some(feeds),
                Some(ReadResult::Sensor(Err(e), _)) => {
                    failed_reads += 1;
                    log_read_failure(&device.device_id, "fetch_sensor_data", &e);
                }
                Some(ReadResult::Camera(Err(e))) => {
                    failed_reads += 1;
                    log_read_failure(&device.device_id, "fetch_camera_feeds", &e);
                }
                Some(ReadResult::Skipped) | None => {}
            }
            devices.push(next);
        }

        let snapshot = Arc::new(RegistrySnapshot {
            generation,
            refreshed_at: now_ms(),
            devices,
        });
        *current = snapshot.clone();
        RefreshOutcome {
            snapshot,
            published: true,
            failed_reads,
        }
    }
}

async fn read_device(store: &dyn DeviceStore, device: &Device) -> ReadResult {
    match device.device_type {
        DeviceType::Sensor => {
            let result = store.fetch_sensor_data(&device.device_id).await;
            ReadResult::Sensor(result, now_ms())
        }
        DeviceType::CameraServer => {
            ReadResult::Camera(store.fetch_camera_feeds(&device.device_id).await)
        }
        DeviceType::Valve => ReadResult::Skipped,
    }
}

fn log_read_failure(device_id: &str, operation: &str, e: &StoreError) {
    match e {
        StoreError::NotFound { .. } => {
            debug!(device_id, operation, "no data yet; keeping previous snapshot")
        }
        _ => warn!(
            device_id,
            operation,
            error = %e,
            "store read failed; keeping previous snapshot"
        ),
    }
}
