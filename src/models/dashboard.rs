// What one poll tick publishes: zones, farm-wide summary, and derived advice.

use serde::{Deserialize, Serialize};

use super::ZoneAggregate;

/// Farm-wide stat cards (average across every reporting device, not per zone).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmSummary {
    pub reporting_devices: usize,
    pub avg_moisture: f64,
    pub avg_temperature: f64,
    /// "Optimal" at or above 50% moisture, "Low" below, "No data" when nothing reported moisture.
    pub moisture_label: String,
    pub healthy_zones: usize,
    pub warning_zones: usize,
    pub critical_zones: usize,
    pub unknown_zones: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    /// Millis since epoch when the snapshot was built.
    pub timestamp: u64,
    /// Poll tick that produced it (0 before the first tick).
    pub generation: u64,
    pub zones: Vec<ZoneAggregate>,
    pub summary: FarmSummary,
}

impl DashboardSnapshot {
    pub fn zone(&self, label: &str) -> Option<&ZoneAggregate> {
        self.zones.iter().find(|z| z.zone_label == label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub zone_label: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
}
