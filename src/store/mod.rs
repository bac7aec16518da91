// Realtime document store access (users/{uid}/devices/...)

mod memory;
mod rtdb;

pub use memory::MemoryStore;
pub use rtdb::RtdbClient;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{Device, SensorReading, ValveStatus};

/// Read/write surface of the per-user device tree.
///
/// Implementations are scoped to one user; paths are relative to `users/{uid}/devices`.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// All claimed devices, without sensor data. An absent tree is an empty list.
    async fn list_devices(&self) -> Result<Vec<Device>, StoreError>;

    /// Latest `sensor_data` node. `NotFound` when the device has not reported yet.
    async fn fetch_sensor_data(&self, device_id: &str) -> Result<SensorReading, StoreError>;

    /// `camera_feeds` node of a camera server.
    async fn fetch_camera_feeds(&self, device_id: &str) -> Result<serde_json::Value, StoreError>;

    /// Raw `valve_control/valveStatus` value, `None` if never written.
    async fn read_valve_status(&self, device_id: &str) -> Result<Option<String>, StoreError>;

    async fn write_valve_status(
        &self,
        device_id: &str,
        status: ValveStatus,
    ) -> Result<(), StoreError>;
}

/// Parses a `users/{uid}/devices` object into devices, sorted by id.
/// Entries without a `device_info` node are not claimed yet and are skipped.
pub(crate) fn parse_device_tree(tree: &serde_json::Value) -> Result<Vec<Device>, StoreError> {
    let Some(map) = tree.as_object() else {
        return Ok(Vec::new());
    };
    let mut devices = Vec::with_capacity(map.len());
    for (id, node) in map {
        let Some(info) = node.get("device_info") else {
            continue;
        };
        let info = serde_json::from_value(info.clone())?;
        devices.push(Device::from_info(id, info));
    }
    devices.sort_by(|a, b| a.device_id.cmp(&b.device_id));
    Ok(devices)
}
