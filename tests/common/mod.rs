// Shared test helpers
#![allow(dead_code)]

use farmwatch::models::*;

pub fn reading(pairs: &[(Metric, f64)]) -> SensorReading {
    pairs
        .iter()
        .fold(SensorReading::default(), |r, &(m, v)| r.with(m, v))
}

pub fn sensor(id: &str, zone: &str, pairs: &[(Metric, f64)]) -> Device {
    Device::new(id, zone, DeviceType::Sensor).with_reading(reading(pairs), 1_000)
}

pub fn silent_sensor(id: &str, zone: &str) -> Device {
    Device::new(id, zone, DeviceType::Sensor)
}

pub fn info(zone: &str, kind: &str) -> DeviceInfo {
    DeviceInfo {
        zone: Some(zone.into()),
        kind: Some(kind.into()),
        ..Default::default()
    }
}
