// Devices as registered under users/{uid}/devices and their latest sensor snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Numeric soil/climate metrics that are averaged per zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Moisture,
    Temperature,
    Ec,
    Ph,
    N,
    P,
    K,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Moisture,
        Metric::Temperature,
        Metric::Ec,
        Metric::Ph,
        Metric::N,
        Metric::P,
        Metric::K,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Sensor,
    CameraServer,
    Valve,
}

impl DeviceType {
    /// Declared `device_info.type` wins; otherwise Raspberry Pi ids (`pi_*`) are camera servers.
    pub fn infer(device_id: &str, declared: Option<&str>) -> Self {
        match declared.map(str::to_ascii_lowercase).as_deref() {
            Some("sensor") => DeviceType::Sensor,
            Some("camera_server") => DeviceType::CameraServer,
            Some("valve") => DeviceType::Valve,
            _ if device_id.starts_with("pi_") => DeviceType::CameraServer,
            _ => DeviceType::Sensor,
        }
    }
}

/// One `sensor_data` object. Fields the firmware did not send stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moisture: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ec: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ph: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<f64>,
    /// Anything else the device reports (humidity, light, timestamp...). Not aggregated.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl SensorReading {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Moisture => self.moisture,
            Metric::Temperature => self.temperature,
            Metric::Ec => self.ec,
            Metric::Ph => self.ph,
            Metric::N => self.n,
            Metric::P => self.p,
            Metric::K => self.k,
        }
    }

    /// Builder used by tests and the in-memory store.
    pub fn with(mut self, metric: Metric, value: f64) -> Self {
        let slot = match metric {
            Metric::Moisture => &mut self.moisture,
            Metric::Temperature => &mut self.temperature,
            Metric::Ec => &mut self.ec,
            Metric::Ph => &mut self.ph,
            Metric::N => &mut self.n,
            Metric::P => &mut self.p,
            Metric::K => &mut self.k,
        };
        *slot = Some(value);
        self
    }
}

/// `device_info` node as written by the firmware at claim time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub firmware_version: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub device_id: String,
    pub name: String,
    pub zone: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub firmware_version: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub sensor_data: Option<SensorReading>,
    /// Millis since epoch of the last successful sensor read.
    #[serde(default)]
    pub last_update: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_feeds: Option<serde_json::Value>,
}

impl Device {
    pub fn new(device_id: impl Into<String>, zone: impl Into<String>, device_type: DeviceType) -> Self {
        let device_id = device_id.into();
        Self {
            name: device_id.clone(),
            device_id,
            zone: zone.into(),
            device_type,
            firmware_version: "1.0.0".into(),
            ip_address: String::new(),
            sensor_data: None,
            last_update: None,
            camera_feeds: None,
        }
    }

    pub fn from_info(device_id: &str, info: DeviceInfo) -> Self {
        let device_type = DeviceType::infer(device_id, info.kind.as_deref());
        Self {
            device_id: device_id.to_string(),
            name: info.name.unwrap_or_else(|| device_id.to_string()),
            zone: info.zone.unwrap_or_else(|| "Unknown".into()),
            device_type,
            firmware_version: info.firmware_version.unwrap_or_else(|| "1.0.0".into()),
            ip_address: info.ip_address.unwrap_or_default(),
            sensor_data: None,
            last_update: None,
            camera_feeds: None,
        }
    }

    pub fn with_reading(mut self, reading: SensorReading, at_ms: u64) -> Self {
        self.sensor_data = Some(reading);
        self.last_update = Some(at_ms);
        self
    }

    pub fn is_reporting(&self) -> bool {
        self.sensor_data.is_some()
    }
}
