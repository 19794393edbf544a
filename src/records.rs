//! Daily habit records
//!
//! The session engine only needs one thing from the record store: after a
//! completed session, today is marked as a success. Records are keyed by
//! `YYYY-MM-DD` date strings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// File name of the JSON store inside the data directory
pub const RECORDS_FILE: &str = "records.json";

/// Outcome recorded for a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// The urge was resisted
    Success,
    /// The habit won
    Slip,
}

/// One day's record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRecord {
    /// Outcome for the day
    pub status: RecordStatus,
    /// What triggered a slip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    /// Free-form note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Unix time in milliseconds when the record was written
    pub timestamp: i64,
}

impl DailyRecord {
    /// A success record stamped now
    #[must_use]
    pub fn success() -> Self {
        Self {
            status: RecordStatus::Success,
            trigger: None,
            note: None,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Keyed store of daily records
pub trait RecordStore {
    /// Record for a date key
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be read
    fn get(&self, date_key: &str) -> Result<Option<DailyRecord>>;

    /// Insert or replace the record for a date key
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be written
    fn put(&mut self, date_key: &str, record: DailyRecord) -> Result<()>;

    /// Remove the record for a date key, if any
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be written
    fn delete(&mut self, date_key: &str) -> Result<()>;
}

/// Format a date as a record key
#[must_use]
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Mark `date` as a success after a completed session
///
/// # Errors
///
/// Returns error if the store cannot be written
pub fn record_success(store: &mut impl RecordStore, date: NaiveDate) -> Result<()> {
    let key = date_key(date);
    store.put(&key, DailyRecord::success())?;
    tracing::info!(date = %key, "success recorded");
    Ok(())
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<String, DailyRecord>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, date_key: &str) -> Result<Option<DailyRecord>> {
        Ok(self.records.get(date_key).cloned())
    }

    fn put(&mut self, date_key: &str, record: DailyRecord) -> Result<()> {
        self.records.insert(date_key.to_string(), record);
        Ok(())
    }

    fn delete(&mut self, date_key: &str) -> Result<()> {
        self.records.remove(date_key);
        Ok(())
    }
}

/// JSON file store, rewritten on every change
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: BTreeMap<String, DailyRecord>,
}

impl JsonFileStore {
    /// Open the store in `data_dir`, creating the directory if needed
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created or an existing file
    /// cannot be parsed
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join(RECORDS_FILE);

        let records = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    Error::Record(format!("failed to parse {}: {e}", path.display()))
                })?
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!(path = %path.display(), records = records.len(), "record store opened");
        Ok(Self { path, records })
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.records)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl RecordStore for JsonFileStore {
    fn get(&self, date_key: &str) -> Result<Option<DailyRecord>> {
        Ok(self.records.get(date_key).cloned())
    }

    fn put(&mut self, date_key: &str, record: DailyRecord) -> Result<()> {
        self.records.insert(date_key.to_string(), record);
        self.save()
    }

    fn delete(&mut self, date_key: &str) -> Result<()> {
        if self.records.remove(date_key).is_some() {
            self.save()?;
        }
        Ok(())
    }
}
