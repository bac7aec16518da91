// In-process device tree. Backs `store.kind = "memory"` (seeded from a JSON export) and tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DeviceStore, parse_device_tree};
use crate::error::StoreError;
use crate::models::{Device, DeviceInfo, SensorReading, ValveStatus};

#[derive(Debug, Clone, Default)]
struct Node {
    info: DeviceInfo,
    sensor_data: Option<SensorReading>,
    camera_feeds: Option<serde_json::Value>,
    valve_status: Option<String>,
}

#[derive(Default)]
pub struct MemoryStore {
    nodes: RwLock<BTreeMap<String, Node>>,
    /// Devices whose reads fail with a network error.
    unreachable: RwLock<HashSet<String>>,
    sensor_reads: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a `users/{uid}/devices` JSON export.
    pub fn from_json_tree(tree: &serde_json::Value) -> Result<Self, StoreError> {
        let mut nodes = BTreeMap::new();
        for device in parse_device_tree(tree)? {
            let raw = &tree[&device.device_id];
            let sensor_data = match raw.get("sensor_data") {
                Some(v) if !v.is_null() => Some(serde_json::from_value(v.clone())?),
                _ => None,
            };
            let info: DeviceInfo = serde_json::from_value(raw["device_info"].clone())?;
            let valve_status = raw
                .pointer("/valve_control/valveStatus")
                .and_then(|v| v.as_str())
                .map(String::from);
            nodes.insert(
                device.device_id,
                Node {
                    info,
                    sensor_data,
                    camera_feeds: raw.get("camera_feeds").cloned(),
                    valve_status,
                },
            );
        }
        Ok(Self {
            nodes: RwLock::new(nodes),
            ..Default::default()
        })
    }

    pub async fn add_device(&self, device_id: &str, info: DeviceInfo) {
        self.nodes
            .write()
            .await
            .entry(device_id.to_string())
            .or_default()
            .info = info;
    }

    pub async fn remove_device(&self, device_id: &str) {
        self.nodes.write().await.remove(device_id);
    }

    pub async fn set_reading(&self, device_id: &str, reading: SensorReading) {
        if let Some(node) = self.nodes.write().await.get_mut(device_id) {
            node.sensor_data = Some(reading);
        }
    }

    pub async fn set_camera_feeds(&self, device_id: &str, feeds: serde_json::Value) {
        if let Some(node) = self.nodes.write().await.get_mut(device_id) {
            node.camera_feeds = Some(feeds);
        }
    }

    /// Stores a valve value verbatim, as firmware might.
    pub async fn set_raw_valve_status(&self, device_id: &str, raw: &str) {
        if let Some(node) = self.nodes.write().await.get_mut(device_id) {
            node.valve_status = Some(raw.to_string());
        }
    }

    pub async fn set_unreachable(&self, device_id: &str, unreachable: bool) {
        let mut set = self.unreachable.write().await;
        if unreachable {
            set.insert(device_id.to_string());
        } else {
            set.remove(device_id);
        }
    }

    /// Number of `fetch_sensor_data` calls served, failed ones included.
    pub fn sensor_reads(&self) -> u64 {
        self.sensor_reads.load(Ordering::Relaxed)
    }

    async fn check_reachable(&self, device_id: &str) -> Result<(), StoreError> {
        if self.unreachable.read().await.contains(device_id) {
            return Err(StoreError::Network(format!("{device_id} unreachable")));
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceStore for MemoryStore {
    async fn list_devices(&self) -> Result<Vec<Device>, StoreError> {
        let nodes = self.nodes.read().await;
        Ok(nodes
            .iter()
            .map(|(id, node)| Device::from_info(id, node.info.clone()))
            .collect())
    }

    async fn fetch_sensor_data(&self, device_id: &str) -> Result<SensorReading, StoreError> {
        self.sensor_reads.fetch_add(1, Ordering::Relaxed);
        self.check_reachable(device_id).await?;
        self.nodes
            .read()
            .await
            .get(device_id)
            .and_then(|n| n.sensor_data.clone())
            .ok_or_else(|| StoreError::NotFound {
                path: format!("devices/{device_id}/sensor_data"),
            })
    }

    async fn fetch_camera_feeds(&self, device_id: &str) -> Result<serde_json::Value, StoreError> {
        self.check_reachable(device_id).await?;
        Ok(self
            .nodes
            .read()
            .await
            .get(device_id)
            .and_then(|n| n.camera_feeds.clone())
            .unwrap_or_else(|| serde_json::json!({})))
    }

    async fn read_valve_status(&self, device_id: &str) -> Result<Option<String>, StoreError> {
        self.check_reachable(device_id).await?;
        Ok(self
            .nodes
            .read()
            .await
            .get(device_id)
            .and_then(|n| n.valve_status.clone()))
    }

    async fn write_valve_status(
        &self,
        device_id: &str,
        status: ValveStatus,
    ) -> Result<(), StoreError> {
        self.check_reachable(device_id).await?;
        let mut nodes = self.nodes.write().await;
        let node = nodes
            .get_mut(device_id)
            .ok_or_else(|| StoreError::NotFound {
                path: format!("devices/{device_id}"),
            })?;
        node.valve_status = Some(status.as_str().to_string());
        Ok(())
    }
}
