use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::angle::circular_distance;

/// Adjustable bounds for the azimuth tolerance control.
pub const AZIMUTH_TOLERANCE_MIN_DEG: f64 = 2.0;
pub const AZIMUTH_TOLERANCE_MAX_DEG: f64 = 30.0;

/// Tolerance windows applied when deciding alignment.
///
/// Azimuth uses a strict circular test, elevation an inclusive linear
/// one. The asymmetry is intentional: it matches the observed behavior
/// of deployed installer clients.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct Tolerances {
    #[serde(default = "default_azimuth_tolerance")]
    pub azimuth_deg: f64,
    #[serde(default = "default_elevation_target")]
    pub elevation_target_deg: f64,
    #[serde(default = "default_elevation_tolerance")]
    pub elevation_deg: f64,
}

fn default_azimuth_tolerance() -> f64 {
    10.0
}

fn default_elevation_target() -> f64 {
    47.0
}

fn default_elevation_tolerance() -> f64 {
    2.0
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            azimuth_deg: default_azimuth_tolerance(),
            elevation_target_deg: default_elevation_target(),
            elevation_deg: default_elevation_tolerance(),
        }
    }
}

impl Tolerances {
    /// True iff the azimuth tolerance sits inside the adjustable range.
    pub fn azimuth_in_range(tolerance_deg: f64) -> bool {
        tolerance_deg.is_finite()
            && (AZIMUTH_TOLERANCE_MIN_DEG..=AZIMUTH_TOLERANCE_MAX_DEG).contains(&tolerance_deg)
    }
}

/// Strict circular test: the minimal arc between heading and target
/// must be strictly below the tolerance. A distance exactly equal to
/// the tolerance does not count as aligned.
pub fn is_azimuth_aligned(heading_deg: f64, target_deg: f64, tolerance_deg: f64) -> bool {
    if !heading_deg.is_finite() || !target_deg.is_finite() || !tolerance_deg.is_finite() {
        return false;
    }
    circular_distance(heading_deg, target_deg) < tolerance_deg
}

/// Inclusive linear test: elevation inside `[target - tol, target + tol]`,
/// both bounds counting as aligned.
pub fn is_elevation_aligned(elevation_deg: f64, target_deg: f64, tolerance_deg: f64) -> bool {
    if !elevation_deg.is_finite() || !target_deg.is_finite() || !tolerance_deg.is_finite() {
        return false;
    }
    elevation_deg >= target_deg - tolerance_deg && elevation_deg <= target_deg + tolerance_deg
}
