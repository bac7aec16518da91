// Valve command validation and read-back

mod common;

use std::sync::Arc;

use common::{info, sensor};
use farmwatch::aggregation::aggregate_all;
use farmwatch::error::ValveError;
use farmwatch::models::{Device, DeviceType, Metric, ValveStatus};
use farmwatch::store::{DeviceStore, MemoryStore};
use farmwatch::valve::ValveController;

async fn setup() -> (Arc<MemoryStore>, ValveController) {
    let store = Arc::new(MemoryStore::new());
    store.add_device("esp32_v1", info("Zone A", "valve")).await;
    let controller = ValveController::new(store.clone());
    (store, controller)
}

#[tokio::test]
async fn lowercase_command_is_rejected_before_write() {
    let (store, valves) = setup().await;
    let err = valves.set_status("esp32_v1", "on").await.unwrap_err();
    assert!(matches!(err, ValveError::Invalid(_)));
    assert_eq!(store.read_valve_status("esp32_v1").await.unwrap(), None);
}

#[tokio::test]
async fn on_is_written_and_read_back() {
    let (store, valves) = setup().await;
    let status = valves.set_status("esp32_v1", "ON").await.unwrap();
    assert_eq!(status, ValveStatus::On);
    assert_eq!(
        store.read_valve_status("esp32_v1").await.unwrap().as_deref(),
        Some("ON")
    );
    assert_eq!(valves.read_status("esp32_v1").await.unwrap(), ValveStatus::On);
    assert_eq!(valves.last_known("esp32_v1").await, ValveStatus::On);
}

#[tokio::test]
async fn never_written_valve_reads_off() {
    let (_store, valves) = setup().await;
    assert_eq!(valves.read_status("esp32_v1").await.unwrap(), ValveStatus::Off);
}

#[tokio::test]
async fn firmware_lowercase_value_reads_leniently() {
    let (store, valves) = setup().await;
    store.set_raw_valve_status("esp32_v1", "on").await;
    assert_eq!(valves.read_status("esp32_v1").await.unwrap(), ValveStatus::On);

    store.set_raw_valve_status("esp32_v1", "half-open").await;
    assert_eq!(valves.read_status("esp32_v1").await.unwrap(), ValveStatus::Off);
}

#[tokio::test]
async fn store_failure_surfaces_as_store_error() {
    let (store, valves) = setup().await;
    store.set_unreachable("esp32_v1", true).await;
    let err = valves.set_status("esp32_v1", "OFF").await.unwrap_err();
    assert!(matches!(err, ValveError::Store(_)));
    assert!(valves.read_status("esp32_v1").await.is_err());
}

#[tokio::test]
async fn auto_watering_opens_valves_of_critical_zones_only() {
    let store = Arc::new(MemoryStore::new());
    store.add_device("esp32_va", info("Zone A", "valve")).await;
    store.add_device("esp32_vb", info("Zone B", "valve")).await;
    let valves = ValveController::new(store.clone());

    let devices = vec![
        sensor("esp32_a1", "Zone A", &[(Metric::Moisture, 12.0)]),
        sensor("esp32_b1", "Zone B", &[(Metric::Moisture, 62.0)]),
        Device::new("esp32_va", "Zone A", DeviceType::Valve),
        Device::new("esp32_vb", "Zone B", DeviceType::Valve),
    ];
    let zones = aggregate_all(&devices);

    let opened = valves.auto_water(&zones, &devices).await;
    assert_eq!(opened, vec!["esp32_va".to_string()]);
    assert_eq!(
        store.read_valve_status("esp32_va").await.unwrap().as_deref(),
        Some("ON")
    );
    assert_eq!(store.read_valve_status("esp32_vb").await.unwrap(), None);

    // Already open: nothing new to write.
    assert!(valves.auto_water(&zones, &devices).await.is_empty());
}

#[tokio::test]
async fn auto_watering_skips_failed_writes() {
    let (store, valves) = setup().await;
    store.set_unreachable("esp32_v1", true).await;
    let devices = vec![
        sensor("esp32_a1", "Zone A", &[(Metric::Moisture, 5.0)]),
        Device::new("esp32_v1", "Zone A", DeviceType::Valve),
    ];
    let opened = valves.auto_water(&aggregate_all(&devices), &devices).await;
    assert!(opened.is_empty());
    assert_eq!(valves.last_known("esp32_v1").await, ValveStatus::Off);
}
