// Integration tests: HTTP and WebSocket endpoints

mod common;

use axum_test::TestServer;
use common::{info, reading};
use farmwatch::history::SnapshotHistory;
use farmwatch::models::*;
use farmwatch::registry::DeviceRegistry;
use farmwatch::routes;
use farmwatch::store::MemoryStore;
use farmwatch::valve::ValveController;
use farmwatch::worker::{Pipeline, PollerStats};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::broadcast;

struct TestApp {
    app: axum::Router,
    tx: broadcast::Sender<DashboardSnapshot>,
    pipeline: Arc<Pipeline>,
    store: Arc<MemoryStore>,
}

async fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    store.add_device("esp32_a1", info("Zone A", "sensor")).await;
    store.add_device("esp32_a2", info("Zone A", "sensor")).await;
    store.add_device("esp32_b1", info("Zone B", "sensor")).await;
    store.add_device("esp32_v1", info("Zone A", "valve")).await;
    store
        .set_reading(
            "esp32_a1",
            reading(&[(Metric::Moisture, 20.0), (Metric::Ph, 5.5)]),
        )
        .await;
    store
        .set_reading("esp32_a2", reading(&[(Metric::Moisture, 40.0)]))
        .await;
    store
        .set_reading("esp32_b1", reading(&[(Metric::Moisture, 80.0)]))
        .await;

    let (tx, _) = broadcast::channel(10);
    let registry = Arc::new(DeviceRegistry::new());
    let history = Arc::new(SnapshotHistory::new(10));
    let pipeline = Arc::new(Pipeline {
        registry: registry.clone(),
        store: store.clone(),
        history: history.clone(),
        tx: tx.clone(),
        stats: Arc::new(PollerStats::default()),
        auto_watering: None,
    });
    let valves = Arc::new(ValveController::new(store.clone()));
    let app = routes::app(
        tx.clone(),
        registry,
        history,
        valves,
        Arc::new(AtomicUsize::new(0)),
    );
    TestApp {
        app,
        tx,
        pipeline,
        store,
    }
}

/// App with one poll already published.
async fn polled_server() -> (TestServer, TestApp) {
    let t = test_app().await;
    let generation = t.pipeline.registry.next_generation();
    t.pipeline.poll_once(generation, true).await.expect("published");
    let server = TestServer::new(t.app.clone());
    (server, t)
}

#[tokio::test]
async fn test_root_endpoint() {
    let t = test_app().await;
    let server = TestServer::new(t.app);
    let response = server.get("/").await;
    response.assert_status_ok();
    response.assert_text("farmwatch: zone monitor is running");
}

#[tokio::test]
async fn test_version_endpoint() {
    let t = test_app().await;
    let server = TestServer::new(t.app);
    let response = server.get("/version").await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json.get("name").and_then(|v| v.as_str()), Some("farmwatch"));
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn test_zones_before_first_poll_are_empty() {
    let t = test_app().await;
    let server = TestServer::new(t.app);
    let zones: Vec<ZoneAggregate> = server.get("/api/zones").await.json();
    assert!(zones.is_empty());
}

#[tokio::test]
async fn test_zones_after_poll() {
    let (server, _t) = polled_server().await;
    let response = server.get("/api/zones").await;
    response.assert_status_ok();
    let zones: Vec<ZoneAggregate> = response.json();
    assert_eq!(zones.len(), 2);
    assert_eq!(zones[0].zone_label, "Zone A");
    assert_eq!(zones[0].averages.moisture, 30.0);
    assert_eq!(zones[0].status, ZoneStatus::Warning);
    assert_eq!(zones[0].device_count, 3);
    assert_eq!(zones[0].reporting_devices, 2);
    assert_eq!(zones[1].status, ZoneStatus::Healthy);
}

#[tokio::test]
async fn test_single_zone_and_missing_zone() {
    let (server, _t) = polled_server().await;
    let zone: ZoneAggregate = server.get("/api/zones/Zone%20B").await.json();
    assert_eq!(zone.averages.moisture, 80.0);

    let response = server.get("/api/zones/Zone%20Q").await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn test_devices_summary_history() {
    let (server, _t) = polled_server().await;

    let devices: Vec<Device> = server.get("/api/devices").await.json();
    assert_eq!(devices.len(), 4);

    let summary: FarmSummary = server.get("/api/summary").await.json();
    assert_eq!(summary.reporting_devices, 3);
    assert_eq!(summary.warning_zones, 1);
    assert_eq!(summary.healthy_zones, 1);

    let history: Vec<DashboardSnapshot> = server
        .get("/api/history")
        .add_query_param("limit", 5)
        .await
        .json();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_recommendations_high_priority_first() {
    let (server, _t) = polled_server().await;
    let recs: Vec<Recommendation> = server.get("/api/recommendations").await.json();
    let titles: Vec<&str> = recs.iter().map(|r| r.title.as_str()).collect();
    assert!(titles.contains(&"Increase Soil pH"));
    assert!(titles.contains(&"Increase Irrigation"));
    assert!(recs.iter().all(|r| r.zone_label == "Zone A"));
    assert_eq!(recs[0].priority, Priority::High);
}

#[tokio::test]
async fn test_valve_put_lowercase_is_bad_request() {
    let (server, t) = polled_server().await;
    let response = server
        .put("/api/devices/esp32_v1/valve")
        .json(&serde_json::json!({ "status": "on" }))
        .await;
    response.assert_status_bad_request();
    use farmwatch::store::DeviceStore;
    assert_eq!(t.store.read_valve_status("esp32_v1").await.unwrap(), None);
}

#[tokio::test]
async fn test_valve_put_then_get() {
    let (server, _t) = polled_server().await;
    let response = server
        .put("/api/devices/esp32_v1/valve")
        .json(&serde_json::json!({ "status": "ON" }))
        .await;
    response.assert_status_ok();

    let json: serde_json::Value = server.get("/api/devices/esp32_v1/valve").await.json();
    assert_eq!(json["deviceId"], "esp32_v1");
    assert_eq!(json["status"], "ON");
}

#[tokio::test]
async fn test_valve_store_failure_is_bad_gateway() {
    let (server, t) = polled_server().await;
    t.store.set_unreachable("esp32_v1", true).await;
    let response = server.get("/api/devices/esp32_v1/valve").await;
    response.assert_status(axum::http::StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_valve_put_unknown_device_is_not_found() {
    let (server, _t) = polled_server().await;
    let response = server
        .put("/api/devices/esp32_missing/valve")
        .json(&serde_json::json!({ "status": "ON" }))
        .await;
    response.assert_status_not_found();
    let json: serde_json::Value = response.json();
    assert!(json["error"].as_str().is_some());
}

// --- WebSocket tests (require http_transport + ws feature) ---
// Receive until we get valid JSON (server may send Ping first).

async fn receive_first_json_text<T: serde::de::DeserializeOwned>(
    ws: &mut axum_test::TestWebSocket,
) -> T {
    let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(3);
    loop {
        let text = ws.receive_text().await;
        if let Ok(v) = serde_json::from_str::<T>(&text) {
            return v;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for JSON"
        );
    }
}

#[tokio::test]
async fn test_ws_dashboard_sends_current_then_broadcasts() {
    let t = test_app().await;
    let generation = t.pipeline.registry.next_generation();
    t.pipeline.poll_once(generation, true).await.expect("published");
    let server = TestServer::builder()
        .http_transport()
        .build(t.app.clone());

    let mut ws = server
        .get_websocket("/ws/dashboard")
        .await
        .into_websocket()
        .await;
    let first: DashboardSnapshot = receive_first_json_text(&mut ws).await;
    assert_eq!(first.generation, generation);
    assert_eq!(first.zones.len(), 2);

    let next = DashboardSnapshot {
        generation: 42,
        timestamp: 7,
        ..Default::default()
    };
    let tx = t.tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        let _ = tx.send(next);
    });
    let received: DashboardSnapshot = receive_first_json_text(&mut ws).await;
    assert_eq!(received.generation, 42);
    assert_eq!(received.timestamp, 7);
}

#[tokio::test]
async fn test_ws_dashboard_skips_older_generations() {
    let t = test_app().await;
    let generation = t.pipeline.registry.next_generation();
    t.pipeline.poll_once(generation, true).await.expect("published");
    let server = TestServer::builder()
        .http_transport()
        .build(t.app.clone());

    let mut ws = server
        .get_websocket("/ws/dashboard")
        .await
        .into_websocket()
        .await;
    let first: DashboardSnapshot = receive_first_json_text(&mut ws).await;
    assert_eq!(first.generation, generation);

    let tx = t.tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        for g in [6, 5, 6, 7] {
            let _ = tx.send(DashboardSnapshot {
                generation: g,
                ..Default::default()
            });
        }
    });
    let a: DashboardSnapshot = receive_first_json_text(&mut ws).await;
    let b: DashboardSnapshot = receive_first_json_text(&mut ws).await;
    assert_eq!(a.generation, 6);
    assert_eq!(b.generation, 7, "generations 5 and a repeated 6 are not forwarded");
}
