//! Watermark persistence
//!
//! The watermark is the newest replicated RT activity. It is read once when a
//! run starts and written once after the run succeeds.

use super::timestamp::{format_ticket_time, parse_ticket_time};
use crate::config::Rt2JiraConfig;
use crate::{Result, Rt2JiraError};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Somewhere to keep the watermark between runs
pub trait WatermarkStore: Send + Sync {
    /// The stored watermark, `None` if nothing has been stored yet
    ///
    /// A stored value that does not parse is a `MalformedTimestamp` error.
    fn load(&self) -> Result<Option<NaiveDateTime>>;

    fn save(&self, watermark: NaiveDateTime) -> Result<()>;
}

/// Keeps the watermark in `rt.last_fetched_timestamp` of the config file
#[derive(Debug, Clone)]
pub struct ConfigFileWatermarkStore {
    path: PathBuf,
}

impl ConfigFileWatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WatermarkStore for ConfigFileWatermarkStore {
    fn load(&self) -> Result<Option<NaiveDateTime>> {
        let config = Rt2JiraConfig::load(&self.path)?;
        config
            .rt
            .last_fetched_timestamp
            .as_deref()
            .map(parse_ticket_time)
            .transpose()
    }

    fn save(&self, watermark: NaiveDateTime) -> Result<()> {
        // Reload so edits made while the run was in progress are kept
        let mut config = Rt2JiraConfig::load(&self.path).map_err(|e| persist_error(&self.path, e))?;
        config.rt.last_fetched_timestamp = Some(format_ticket_time(&watermark));
        config
            .save(&self.path)
            .map_err(|e| persist_error(&self.path, e))?;

        tracing::info!(
            path = %self.path.display(),
            watermark = %format_ticket_time(&watermark),
            "Saved last fetched timestamp"
        );
        Ok(())
    }
}

fn persist_error(path: &Path, e: Rt2JiraError) -> Rt2JiraError {
    Rt2JiraError::Persist(format!("{}: {}", path.display(), e))
}

/// In-process store, for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryWatermarkStore {
    value: Mutex<Option<NaiveDateTime>>,
}

impl MemoryWatermarkStore {
    pub fn new(initial: Option<NaiveDateTime>) -> Self {
        Self {
            value: Mutex::new(initial),
        }
    }

    pub fn get(&self) -> Option<NaiveDateTime> {
        *self.value.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl WatermarkStore for MemoryWatermarkStore {
    fn load(&self) -> Result<Option<NaiveDateTime>> {
        Ok(self.get())
    }

    fn save(&self, watermark: NaiveDateTime) -> Result<()> {
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = Some(watermark);
        Ok(())
    }
}
