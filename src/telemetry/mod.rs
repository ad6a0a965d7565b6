mod client;
mod error;
mod sampler;
mod types;

pub use client::TelemetryClient;
pub use error::TelemetryError;
pub use sampler::{TelemetrySampler, DEFAULT_POLL_INTERVAL};
pub use types::{SignalLevel, TelemetryPayload, TelemetrySample};
