//! Dataset assembly and flat-file persistence
//!
//! Folds per-attachment record sequences into one ordered dataset and writes
//! it as a CSV with fixed column order. The dataset file on disk is shared
//! mutable state across requests with no locking; concurrent extraction
//! requests can race on the same path. Known limitation of a low-traffic
//! single-operator tool.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::info;

use crate::error::Result;
use crate::models::TransactionDataset;

/// Persist the dataset as a CSV file, overwriting any previous run's output.
///
/// The header row and column order come from the record's serde field names:
/// Date & Time, Transaction, Type, Amount.
pub fn write_csv(dataset: &TransactionDataset, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for record in dataset.records() {
        writer.serialize(record)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = dataset.len(), "wrote dataset CSV");
    Ok(())
}

/// Locate the most recently modified `.csv` file in a directory.
///
/// Returns `Ok(None)` when the directory is missing or holds no CSV files.
pub fn find_latest_csv(dir: &Path) -> Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        match &latest {
            Some((newest, _)) if *newest >= modified => {}
            _ => latest = Some((modified, path)),
        }
    }

    Ok(latest.map(|(_, path)| path))
}
