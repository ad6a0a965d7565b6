use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use utoipa::ToSchema;

use super::error::TelemetryError;
use crate::align::normalize_deg;

/// Signal quality descriptor as classified by the telemetry endpoint.
/// Anything the endpoint sends that we do not recognize degrades to
/// `Unknown` instead of failing the whole payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Display, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SignalLevel {
    Strong,
    Moderate,
    Weak,
    #[serde(other)]
    Unknown,
}

/// One telemetry observation. Immutable once received; the next poll
/// supersedes it wholesale, samples are never partially merged.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TelemetrySample {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub signal: SignalLevel,
    pub satellite: String,
    pub observed_at: DateTime<Utc>,
}

/// Wire shape of the telemetry endpoint response. Field names as
/// received; everything optional so a partial payload deserializes and
/// gets rejected with a precise error instead of a serde one.
#[derive(Debug, Deserialize)]
pub struct TelemetryPayload {
    pub azimuth: Option<f64>,
    pub elevation: Option<f64>,
    pub signal: Option<SignalLevel>,
    pub satellite: Option<String>,
}

impl TelemetryPayload {
    pub fn into_sample(self, observed_at: DateTime<Utc>) -> Result<TelemetrySample, TelemetryError> {
        let azimuth = self
            .azimuth
            .filter(|a| a.is_finite())
            .ok_or_else(|| TelemetryError::MalformedPayload("missing or non-finite azimuth".into()))?;
        let elevation = self
            .elevation
            .filter(|e| e.is_finite())
            .ok_or_else(|| {
                TelemetryError::MalformedPayload("missing or non-finite elevation".into())
            })?;

        Ok(TelemetrySample {
            azimuth_deg: normalize_deg(azimuth),
            elevation_deg: elevation,
            signal: self.signal.unwrap_or(SignalLevel::Unknown),
            satellite: self.satellite.unwrap_or_default(),
            observed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<TelemetrySample, TelemetryError> {
        let payload: TelemetryPayload = serde_json::from_str(json).unwrap();
        payload.into_sample(Utc::now())
    }

    #[test]
    fn full_payload_parses() {
        let sample = parse(
            r#"{"azimuth": 231.5, "elevation": 41.2, "signal": "strong", "satellite": "Starlink-3428"}"#,
        )
        .unwrap();
        assert_eq!(sample.azimuth_deg, 231.5);
        assert_eq!(sample.elevation_deg, 41.2);
        assert_eq!(sample.signal, SignalLevel::Strong);
        assert_eq!(sample.satellite, "Starlink-3428");
    }

    #[test]
    fn azimuth_is_normalized_into_compass_range() {
        let sample = parse(r#"{"azimuth": 370.0, "elevation": 41.2}"#).unwrap();
        assert_eq!(sample.azimuth_deg, 10.0);
        let sample = parse(r#"{"azimuth": -10.0, "elevation": 41.2}"#).unwrap();
        assert_eq!(sample.azimuth_deg, 350.0);
    }

    #[test]
    fn missing_angles_are_rejected() {
        assert!(matches!(
            parse(r#"{"elevation": 41.2}"#),
            Err(TelemetryError::MalformedPayload(_))
        ));
        assert!(matches!(
            parse(r#"{"azimuth": 231.5}"#),
            Err(TelemetryError::MalformedPayload(_))
        ));
    }

    #[test]
    fn missing_descriptors_fall_back() {
        let sample = parse(r#"{"azimuth": 231.5, "elevation": 41.2}"#).unwrap();
        assert_eq!(sample.signal, SignalLevel::Unknown);
        assert_eq!(sample.satellite, "");
    }

    #[test]
    fn unrecognized_signal_degrades_to_unknown() {
        let sample =
            parse(r#"{"azimuth": 231.5, "elevation": 41.2, "signal": "excellent"}"#).unwrap();
        assert_eq!(sample.signal, SignalLevel::Unknown);
    }

    #[test]
    fn signal_levels_render_lowercase() {
        assert_eq!(SignalLevel::Strong.to_string(), "strong");
        assert_eq!(SignalLevel::Unknown.to_string(), "unknown");
    }
}
