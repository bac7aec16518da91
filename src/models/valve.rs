// Valve state as stored at valve_control/valveStatus.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InvalidValveCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValveStatus {
    #[serde(rename = "ON")]
    On,
    #[serde(rename = "OFF")]
    Off,
}

impl ValveStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ValveStatus::On => "ON",
            ValveStatus::Off => "OFF",
        }
    }

    /// Read-side parsing: tolerates quotes, whitespace and case from older firmware.
    pub fn parse_stored(raw: &str) -> Option<Self> {
        let trimmed = raw.trim().trim_matches('"');
        match trimmed.to_ascii_uppercase().as_str() {
            "ON" => Some(ValveStatus::On),
            "OFF" => Some(ValveStatus::Off),
            _ => None,
        }
    }
}

/// Command-side parsing: exactly "ON" or "OFF".
impl FromStr for ValveStatus {
    type Err = InvalidValveCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ON" => Ok(ValveStatus::On),
            "OFF" => Ok(ValveStatus::Off),
            other => Err(InvalidValveCommand(other.to_string())),
        }
    }
}

impl fmt::Display for ValveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
