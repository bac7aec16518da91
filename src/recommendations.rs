// Soil advice derived from a zone's averages.
// Rules only fire for metrics at least one device in the zone reported.

use crate::models::{Metric, Priority, Recommendation, ZoneAggregate};

const PH_LOW: f64 = 6.0;
const PH_HIGH: f64 = 6.5;
const MOISTURE_LOW: f64 = 50.0;
const MOISTURE_HIGH: f64 = 80.0;
const NITROGEN_LOW: f64 = 70.0;
const PHOSPHORUS_LOW: f64 = 65.0;

pub fn recommend(zone: &ZoneAggregate) -> Vec<Recommendation> {
    let avg = &zone.averages;
    let mut out = Vec::new();
    let mut push = |title: &str, description: &str, priority: Priority| {
        out.push(Recommendation {
            zone_label: zone.zone_label.clone(),
            title: title.to_string(),
            description: description.to_string(),
            priority,
        });
    };

    if zone.has_metric(Metric::Ph) {
        if avg.ph < PH_LOW {
            push(
                "Increase Soil pH",
                "Add lime to raise pH to optimal range (6.0-6.5)",
                Priority::High,
            );
        } else if avg.ph > PH_HIGH {
            push(
                "Decrease Soil pH",
                "Add sulfur or organic matter to lower pH",
                Priority::Medium,
            );
        }
    }

    if zone.has_metric(Metric::Moisture) {
        if avg.moisture < MOISTURE_LOW {
            push(
                "Increase Irrigation",
                "Soil moisture is below optimal. Increase watering frequency.",
                Priority::High,
            );
        } else if avg.moisture > MOISTURE_HIGH {
            push(
                "Reduce Irrigation",
                "Soil is too wet. Reduce watering to prevent root rot.",
                Priority::Medium,
            );
        }
    }

    if zone.has_metric(Metric::N) && avg.n < NITROGEN_LOW {
        push(
            "Add Nitrogen Fertilizer",
            "Nitrogen levels are low. Apply nitrogen-rich fertilizer.",
            Priority::High,
        );
    }

    if zone.has_metric(Metric::P) && avg.p < PHOSPHORUS_LOW {
        push(
            "Add Phosphorus",
            "Phosphorus levels are low. Apply phosphorus fertilizer.",
            Priority::Medium,
        );
    }

    out
}

/// Recommendations for every zone, highest priority first (stable within a priority).
pub fn recommend_all(zones: &[ZoneAggregate]) -> Vec<Recommendation> {
    let mut all: Vec<Recommendation> = zones.iter().flat_map(recommend).collect();
    all.sort_by(|a, b| b.priority.cmp(&a.priority));
    all
}
