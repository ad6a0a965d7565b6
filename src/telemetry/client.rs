use chrono::Utc;

use super::error::TelemetryError;
use super::types::{TelemetryPayload, TelemetrySample};
use crate::position::Coordinates;

/// Thin wrapper over the telemetry HTTP endpoint:
/// `GET <base>?lat=<float>&lon=<float>`.
#[derive(Debug, Clone)]
pub struct TelemetryClient {
    http: reqwest::Client,
    base_url: String,
}

impl TelemetryClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub async fn fetch(&self, position: Coordinates) -> Result<TelemetrySample, TelemetryError> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[("lat", position.latitude), ("lon", position.longitude)])
            .send()
            .await?
            .error_for_status()?;

        let payload: TelemetryPayload = response
            .json()
            .await
            .map_err(|e| TelemetryError::MalformedPayload(e.to_string()))?;

        payload.into_sample(Utc::now())
    }
}
