// Zone aggregation: pure functions over a device list.
// Registry snapshots feed in here once per poll tick; nothing is cached.

use std::collections::BTreeMap;

use crate::classify::{WARNING_MOISTURE, classify};
use crate::models::{
    DashboardSnapshot, Device, FarmSummary, Metric, SensorAverages, ZoneAggregate, ZoneStatus,
};

/// Aggregates the devices labelled `zone_label`; devices from other zones are ignored.
///
/// Each metric is averaged independently over the devices that reported it. A metric
/// nobody reported averages to 0 and is left out of `metrics`.
pub fn aggregate_zone<'a>(
    devices: impl IntoIterator<Item = &'a Device>,
    zone_label: &str,
) -> ZoneAggregate {
    let in_zone: Vec<&Device> = devices
        .into_iter()
        .filter(|d| d.zone == zone_label)
        .collect();
    let readings: Vec<_> = in_zone
        .iter()
        .filter_map(|d| d.sensor_data.as_ref())
        .collect();

    let mut averages = SensorAverages::default();
    let mut metrics = Vec::new();
    for metric in Metric::ALL {
        let values: Vec<f64> = readings.iter().filter_map(|r| r.get(metric)).collect();
        if !values.is_empty() {
            metrics.push(metric);
        }
        averages.set(metric, mean_f64(&values));
    }

    let moisture = metrics
        .contains(&Metric::Moisture)
        .then_some(averages.moisture);

    ZoneAggregate {
        zone_label: zone_label.to_string(),
        device_count: in_zone.len(),
        reporting_devices: readings.len(),
        averages,
        metrics,
        status: classify(moisture),
    }
}

/// Groups devices by zone label, sorted by label. Devices with an empty zone are skipped.
pub fn group_by_zone<'a>(
    devices: impl IntoIterator<Item = &'a Device>,
) -> BTreeMap<&'a str, Vec<&'a Device>> {
    let mut by_zone: BTreeMap<&str, Vec<&Device>> = BTreeMap::new();
    for d in devices {
        if d.zone.trim().is_empty() {
            continue;
        }
        by_zone.entry(d.zone.as_str()).or_default().push(d);
    }
    by_zone
}

/// One aggregate per zone, in label order.
pub fn aggregate_all<'a>(devices: impl IntoIterator<Item = &'a Device>) -> Vec<ZoneAggregate> {
    group_by_zone(devices)
        .into_iter()
        .map(|(label, zone_devices)| aggregate_zone(zone_devices, label))
        .collect()
}

/// Farm-wide stat cards plus per-status zone counts.
pub fn summarize<'a>(
    devices: impl IntoIterator<Item = &'a Device>,
    zones: &[ZoneAggregate],
) -> FarmSummary {
    let readings: Vec<_> = devices
        .into_iter()
        .filter_map(|d| d.sensor_data.as_ref())
        .collect();
    let moisture: Vec<f64> = readings.iter().filter_map(|r| r.moisture).collect();
    let temperature: Vec<f64> = readings.iter().filter_map(|r| r.temperature).collect();
    let avg_moisture = mean_f64(&moisture);

    let moisture_label = if moisture.is_empty() {
        "No data"
    } else if avg_moisture >= WARNING_MOISTURE {
        "Optimal"
    } else {
        "Low"
    };

    let count = |status: ZoneStatus| zones.iter().filter(|z| z.status == status).count();

    FarmSummary {
        reporting_devices: readings.len(),
        avg_moisture,
        avg_temperature: mean_f64(&temperature),
        moisture_label: moisture_label.to_string(),
        healthy_zones: count(ZoneStatus::Healthy),
        warning_zones: count(ZoneStatus::Warning),
        critical_zones: count(ZoneStatus::Critical),
        unknown_zones: count(ZoneStatus::Unknown),
    }
}

/// Runs aggregation and summary over one consistent device list.
pub fn build_snapshot(devices: &[Device], generation: u64, timestamp: u64) -> DashboardSnapshot {
    let zones = aggregate_all(devices);
    let summary = summarize(devices, &zones);
    DashboardSnapshot {
        timestamp,
        generation,
        zones,
        summary,
    }
}

fn mean_f64(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    v.iter().sum::<f64>() / (v.len() as f64)
}
