// Domain errors: remote store failures and valve command rejection

use thiserror::Error;

/// Failure talking to the realtime store. Callers keep their previous state on any of these.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Network(String),
    #[error("store returned HTTP {status}")]
    Status { status: u16 },
    #[error("no data at {path}")]
    NotFound { path: String },
    #[error("failed to decode store response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            StoreError::Decode(e.to_string())
        } else {
            StoreError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Decode(e.to_string())
    }
}

/// Valve command string was not exactly "ON" or "OFF".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid valve command {0:?}: must be \"ON\" or \"OFF\"")]
pub struct InvalidValveCommand(pub String);

#[derive(Debug, Error)]
pub enum ValveError {
    #[error(transparent)]
    Invalid(#[from] InvalidValveCommand),
    #[error(transparent)]
    Store(#[from] StoreError),
}
