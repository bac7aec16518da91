// Irrigation valve control through valve_control/valveStatus

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{StoreError, ValveError};
use crate::models::{Device, DeviceType, ValveStatus, ZoneAggregate, ZoneStatus};
use crate::store::DeviceStore;

pub struct ValveController {
    store: Arc<dyn DeviceStore>,
    last_known: RwLock<HashMap<String, ValveStatus>>,
}

impl ValveController {
    pub fn new(store: Arc<dyn DeviceStore>) -> Self {
        Self {
            store,
            last_known: RwLock::new(HashMap::new()),
        }
    }

    /// Validates `raw` (exactly "ON" or "OFF") before anything is written.
    pub async fn set_status(&self, device_id: &str, raw: &str) -> Result<ValveStatus, ValveError> {
        let status: ValveStatus = raw.parse()?;
        self.store.write_valve_status(device_id, status).await?;
        self.last_known
            .write()
            .await
            .insert(device_id.to_string(), status);
        info!(device_id, status = %status, "valve status written");
        Ok(status)
    }

    /// Reads the stored value. Missing reads as OFF; so does anything unparseable.
    pub async fn read_status(&self, device_id: &str) -> Result<ValveStatus, StoreError> {
        let status = match self.store.read_valve_status(device_id).await? {
            None => ValveStatus::Off,
            Some(raw) => ValveStatus::parse_stored(&raw).unwrap_or_else(|| {
                warn!(device_id, raw = %raw, "invalid stored valve status; treating as OFF");
                ValveStatus::Off
            }),
        };
        self.last_known
            .write()
            .await
            .insert(device_id.to_string(), status);
        Ok(status)
    }

    /// Opens the valves of every critical zone. Valves this process already knows to be ON
    /// are left alone. Returns the ids switched on; write failures are logged and skipped.
    pub async fn auto_water(&self, zones: &[ZoneAggregate], devices: &[Device]) -> Vec<String> {
        let mut opened = Vec::new();
        for zone in zones.iter().filter(|z| z.status == ZoneStatus::Critical) {
            let valves = devices
                .iter()
                .filter(|d| d.device_type == DeviceType::Valve && d.zone == zone.zone_label);
            for valve in valves {
                if self.last_known(&valve.device_id).await == ValveStatus::On {
                    continue;
                }
                match self.set_status(&valve.device_id, ValveStatus::On.as_str()).await {
                    Ok(_) => {
                        info!(
                            operation = "auto_watering",
                            zone = %zone.zone_label,
                            device_id = %valve.device_id,
                            moisture = zone.averages.moisture,
                            "low moisture; valve opened"
                        );
                        opened.push(valve.device_id.clone());
                    }
                    Err(e) => warn!(
                        operation = "auto_watering",
                        zone = %zone.zone_label,
                        device_id = %valve.device_id,
                        error = %e,
                        "failed to open valve"
                    ),
                }
            }
        }
        opened
    }

    /// Last status seen or written by this process, without a store round-trip.
    pub async fn last_known(&self, device_id: &str) -> ValveStatus {
        self.last_known
            .read()
            .await
            .get(device_id)
            .copied()
            .unwrap_or(ValveStatus::Off)
    }
}
