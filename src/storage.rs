use std::fs;
use std::path::{Path, PathBuf};

use crate::models::TrackerData;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("data directory not found")]
    NoDataDir,
}

/// Default location of the tracker data file.
pub fn default_data_path() -> Result<PathBuf, StorageError> {
    let dir = dirs::data_local_dir()
        .ok_or(StorageError::NoDataDir)?
        .join("cykel");
    Ok(dir.join("data.json"))
}

/// Check if a data file exists (i.e., tracking has been set up before).
pub fn data_exists(path: &Path) -> bool {
    path.exists()
}

/// Save tracker data as pretty JSON, creating parent directories.
pub fn save(path: &Path, data: &TrackerData) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec_pretty(data)?;
    fs::write(path, json)?;
    log::debug!("saved tracker data to {}", path.display());
    Ok(())
}

pub fn load(path: &Path) -> Result<TrackerData, StorageError> {
    let raw = fs::read(path)?;
    let data: TrackerData = serde_json::from_slice(&raw)?;
    log::debug!(
        "loaded {} cycles, {} BBT samples, {} symptom logs from {}",
        data.cycles.len(),
        data.bbt.len(),
        data.symptoms.len(),
        path.display()
    );
    Ok(data)
}

/// Write an exported iCalendar document.
pub fn write_calendar(path: &Path, ics: &str) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, ics)?;
    log::info!("wrote calendar export to {}", path.display());
    Ok(())
}
