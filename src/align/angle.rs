/// Wraparound-safe angle arithmetic in degrees.
///
/// Headings and azimuths live on a circle, so plain subtraction gives
/// nonsense near the 0/360 seam (350 vs 5 is 15 degrees apart, not 345).
/// All functions here are pure and never panic; NaN inputs propagate as NaN.

/// Maps any degree value into `[0, 360)`.
pub fn normalize_deg(x: f64) -> f64 {
    x.rem_euclid(360.0)
}

/// Signed shortest rotation from `b` to `a`, in `(-180, 180]`.
pub fn angular_delta(a: f64, b: f64) -> f64 {
    let d = normalize_deg(a - b);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// Minimal arc between two bearings, in `[0, 180]`.
pub fn circular_distance(a: f64, b: f64) -> f64 {
    angular_delta(a, b).abs()
}
