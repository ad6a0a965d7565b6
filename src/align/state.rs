use serde::Serialize;
use strum_macros::Display;
use utoipa::ToSchema;

use super::tolerance::{is_azimuth_aligned, is_elevation_aligned, Tolerances};

/// Discrete transition emitted when the fully-aligned flag changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AlignmentEvent {
    LockAcquired,
    LockLost,
}

/// Informational projection of the two sub-flags. Only the edge between
/// `FullyAligned` and the other two phases triggers side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentPhase {
    NotAligned,
    PartiallyAligned,
    FullyAligned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct AlignmentState {
    pub azimuth_aligned: bool,
    pub elevation_aligned: bool,
    /// Always the AND of the two sub-flags from the same evaluation.
    pub fully_aligned: bool,
}

impl Default for AlignmentState {
    fn default() -> Self {
        Self {
            azimuth_aligned: false,
            elevation_aligned: false,
            fully_aligned: false,
        }
    }
}

impl AlignmentState {
    pub fn phase(&self) -> AlignmentPhase {
        match (self.fully_aligned, self.azimuth_aligned || self.elevation_aligned) {
            (true, _) => AlignmentPhase::FullyAligned,
            (false, true) => AlignmentPhase::PartiallyAligned,
            (false, false) => AlignmentPhase::NotAligned,
        }
    }
}

/// Debounces the lock verdict: feedback fires once per transition, not
/// once per sample. The machine starts not-aligned, so the very first
/// evaluation can produce at most a `LockAcquired`, never a spurious
/// `LockLost`.
#[derive(Debug, Default)]
pub struct AlignmentMachine {
    state: AlignmentState,
    previously_fully_aligned: bool,
}

impl AlignmentMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AlignmentState {
        self.state
    }

    pub fn phase(&self) -> AlignmentPhase {
        self.state.phase()
    }

    /// Recomputes both sub-flags against the tolerance windows and
    /// reports the edge, if any, relative to the previous evaluation.
    pub fn evaluate(
        &mut self,
        heading_deg: f64,
        target_azimuth_deg: f64,
        elevation_deg: f64,
        tolerances: &Tolerances,
    ) -> Option<AlignmentEvent> {
        let azimuth_aligned =
            is_azimuth_aligned(heading_deg, target_azimuth_deg, tolerances.azimuth_deg);
        let elevation_aligned = is_elevation_aligned(
            elevation_deg,
            tolerances.elevation_target_deg,
            tolerances.elevation_deg,
        );

        self.state = AlignmentState {
            azimuth_aligned,
            elevation_aligned,
            fully_aligned: azimuth_aligned && elevation_aligned,
        };

        let event = match (self.state.fully_aligned, self.previously_fully_aligned) {
            (true, false) => Some(AlignmentEvent::LockAcquired),
            (false, true) => Some(AlignmentEvent::LockLost),
            _ => None,
        };
        self.previously_fully_aligned = self.state.fully_aligned;
        event
    }
}
