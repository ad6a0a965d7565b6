use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::align::Tolerances;
use crate::position::Coordinates;
use crate::telemetry::DEFAULT_POLL_INTERVAL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub station: StationConfig,
    #[serde(default)]
    pub tolerances: Tolerances,
    pub logbook: LogbookConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub api_keys: Vec<ApiKey>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Base URL of the telemetry endpoint; queried as `?lat=..&lon=..`.
    pub url: String,
    #[serde(
        default = "default_poll_interval",
        deserialize_with = "deserialize_interval"
    )]
    pub poll_interval: Duration,
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

fn deserialize_interval<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
}

/// Fixed installation site. Optional: roaming installers push positions
/// through the sensor API instead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StationConfig {
    pub name: Option<String>,
    pub coordinates: Option<String>,
}

impl StationConfig {
    pub fn position(&self) -> Option<Coordinates> {
        self.coordinates
            .as_deref()
            .and_then(Coordinates::from_str_pair)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogbookConfig {
    pub storage_file: PathBuf,
    #[serde(default = "default_export_folder")]
    pub export_folder: PathBuf,
}

fn default_export_folder() -> PathBuf {
    PathBuf::from("exports")
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackConfig {
    /// Shell hook spawned once per acquired lock.
    pub lock_command: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKey {
    pub key: String,
    pub name: String,
    pub permissions: HashSet<Permission>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    PushSensors,
    AdjustTolerance,
    ManageLog,
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn find_api_key(&self, key: &str) -> Option<&ApiKey> {
        self.api_keys.iter().find(|k| k.key == key)
    }
}
