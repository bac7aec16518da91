// Moisture-band zone classification. Temperature does not take part.

use crate::models::ZoneStatus;

/// Below this average moisture (%) a zone is critical.
pub const CRITICAL_MOISTURE: f64 = 30.0;
/// Below this average moisture (%) a zone needs attention.
pub const WARNING_MOISTURE: f64 = 50.0;

/// Strict `<` on both bands: 30.0 is warning, 50.0 is healthy.
pub fn classify_moisture(moisture: f64) -> ZoneStatus {
    if moisture < CRITICAL_MOISTURE {
        ZoneStatus::Critical
    } else if moisture < WARNING_MOISTURE {
        ZoneStatus::Warning
    } else {
        ZoneStatus::Healthy
    }
}

/// `None` (no device reported moisture) maps to `Unknown`.
pub fn classify(moisture: Option<f64>) -> ZoneStatus {
    moisture.map_or(ZoneStatus::Unknown, classify_moisture)
}
