// Domain models shared by the registry, aggregator and HTTP layer

mod dashboard;
mod device;
mod valve;
mod zone;

pub use dashboard::{DashboardSnapshot, FarmSummary, Priority, Recommendation};
pub use device::{Device, DeviceInfo, DeviceType, Metric, SensorReading};
pub use valve::ValveStatus;
pub use zone::{SensorAverages, ZoneAggregate, ZoneStatus};

/// Millis since the Unix epoch; 0 if the clock is before it.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}
