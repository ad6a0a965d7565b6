use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("no position fix available yet")]
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Parses a `"lat, lon"` pair as written in config files.
    pub fn from_str_pair(coordinates: &str) -> Option<Self> {
        let parts: Vec<_> = coordinates.split(',').map(|s| s.trim()).collect();
        if parts.len() != 2 {
            return None;
        }
        let latitude: f64 = parts[0].parse().ok()?;
        let longitude: f64 = parts[1].parse().ok()?;
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        Some(Self {
            latitude,
            longitude,
        })
    }
}

/// Source of the device's current coordinates. Implementations may be
/// backed by a live GPS feed or a fixed survey point; lookups can fail
/// while no fix exists.
pub trait PositionProvider: Send + Sync {
    fn current(&self) -> Result<Coordinates, PositionError>;
}

/// Last-known-fix slot written by the sensor boundary and read by the
/// sampler and the logbook. Single writer, many readers.
#[derive(Debug, Clone, Default)]
pub struct SharedPosition {
    slot: Arc<Mutex<Option<Coordinates>>>,
}

impl SharedPosition {
    pub fn new(initial: Option<Coordinates>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn update(&self, coordinates: Coordinates) {
        *self.slot.lock().unwrap() = Some(coordinates);
    }
}

impl PositionProvider for SharedPosition {
    fn current(&self) -> Result<Coordinates, PositionError> {
        self.slot.lock().unwrap().ok_or(PositionError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_coordinate_pairs() {
        let c = Coordinates::from_str_pair("40.4168, -3.7038").unwrap();
        assert_eq!(c.latitude, 40.4168);
        assert_eq!(c.longitude, -3.7038);
        assert!(Coordinates::from_str_pair("40.4168").is_none());
        assert!(Coordinates::from_str_pair("a, b").is_none());
        assert!(Coordinates::from_str_pair("1, 2, 3").is_none());
    }

    #[test]
    fn shared_position_starts_without_a_fix() {
        let position = SharedPosition::default();
        assert!(position.current().is_err());

        position.update(Coordinates {
            latitude: 10.0,
            longitude: -14.0,
        });
        let fix = position.current().unwrap();
        assert_eq!(fix.latitude, 10.0);
        assert_eq!(fix.longitude, -14.0);
    }
}
