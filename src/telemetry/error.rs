use thiserror::Error;

use crate::position::PositionError;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("sampler already running")]
    AlreadyRunning,
    #[error("position lookup failed: {0}")]
    Position(#[from] PositionError),
    #[error("telemetry request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("malformed telemetry payload: {0}")]
    MalformedPayload(String),
}
