use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::LogbookError;
use super::store::LogStore;
use crate::position::Coordinates;

/// One installation record, written exactly once per acquired lock.
/// Field order is the serialization order; keep it stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub location: Coordinates,
    pub heading_deg: f64,
    pub azimuth_deg: f64,
    pub satellite: String,
}

/// Ordered, append-only installer log. The in-memory sequence is the
/// source of truth for the session; every append persists the full
/// serialized sequence best-effort.
pub struct InstallerLog {
    entries: Vec<LogEntry>,
    store: Box<dyn LogStore>,
}

impl InstallerLog {
    /// Reconstructs the log from persisted storage. Absent storage means
    /// an empty log; an unreadable or corrupt payload is logged and also
    /// yields an empty log rather than an error.
    pub fn load(store: Box<dyn LogStore>) -> Self {
        let entries = match store.get() {
            Ok(Some(payload)) => match serde_json::from_str(&payload) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("discarding corrupt installer log payload: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("failed to read installer log storage: {}", e);
                Vec::new()
            }
        };
        Self { entries, store }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends and persists. A persistence failure is reported but does
    /// not roll back the in-memory append. Returns the new length.
    pub fn append(&mut self, entry: LogEntry) -> usize {
        self.entries.push(entry);
        match serde_json::to_string(&self.entries) {
            Ok(payload) => {
                if let Err(e) = self.store.set(&payload) {
                    log::error!("failed to persist installer log: {}", e);
                }
            }
            Err(e) => log::error!("failed to serialize installer log: {}", e),
        }
        self.entries.len()
    }

    /// Empties the sequence and clears persisted storage.
    pub fn reset(&mut self) {
        self.entries.clear();
        if let Err(e) = self.store.delete() {
            log::error!("failed to clear installer log storage: {}", e);
        }
    }

    /// Deterministic textual serialization of the full sequence, for
    /// hand-off to the export collaborator.
    pub fn export_serialized(&self) -> Result<String, LogbookError> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }
}
