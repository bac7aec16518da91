// Per-zone aggregate and its status band.

use serde::{Deserialize, Serialize};

use super::Metric;

/// Health band of a zone. Serializes lowercase (e.g. "warning").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneStatus {
    Healthy,
    Warning,
    Critical,
    /// No device in the zone reported moisture.
    Unknown,
}

/// Mean of each metric across reporting devices; 0 when no device has the metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorAverages {
    pub moisture: f64,
    pub temperature: f64,
    pub ec: f64,
    pub ph: f64,
    pub n: f64,
    pub p: f64,
    pub k: f64,
}

impl SensorAverages {
    pub fn set(&mut self, metric: Metric, value: f64) {
        match metric {
            Metric::Moisture => self.moisture = value,
            Metric::Temperature => self.temperature = value,
            Metric::Ec => self.ec = value,
            Metric::Ph => self.ph = value,
            Metric::N => self.n = value,
            Metric::P => self.p = value,
            Metric::K => self.k = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneAggregate {
    pub zone_label: String,
    /// All devices assigned to the zone, reporting or not.
    pub device_count: usize,
    /// Devices with a sensor snapshot; the denominator for averages.
    pub reporting_devices: usize,
    pub averages: SensorAverages,
    /// Metrics present on at least one reporting device.
    pub metrics: Vec<Metric>,
    pub status: ZoneStatus,
}

impl ZoneAggregate {
    pub fn has_metric(&self, metric: Metric) -> bool {
        self.metrics.contains(&metric)
    }
}
