mod angle;
mod state;
mod tolerance;

pub use angle::{angular_delta, circular_distance, normalize_deg};
pub use state::{AlignmentEvent, AlignmentMachine, AlignmentPhase, AlignmentState};
pub use tolerance::{
    is_azimuth_aligned, is_elevation_aligned, Tolerances, AZIMUTH_TOLERANCE_MAX_DEG,
    AZIMUTH_TOLERANCE_MIN_DEG,
};
