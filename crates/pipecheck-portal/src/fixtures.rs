//! Offline records: a directory of `.json` and `.jsonl` files.
//!
//! A `.json` file holds one record, an array of records, or a bundle object
//! with a `records` array. A `.jsonl` file holds one record per line; blank
//! lines and lines starting with `#` are skipped. Other files are ignored.

use crate::error::PortalError;
use pipecheck_kernel::RecordStore;
use serde_json::Value;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Load every record under `dir` (non-recursive, in file-name order).
pub fn load_fixture_dir(dir: impl AsRef<Path>) -> Result<RecordStore, PortalError> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|e| io_error(dir, e))?;
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| io_error(dir, e))?.path();
        if path.is_file() && is_record_file(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut store = RecordStore::new();
    for path in &paths {
        let records = read_records(path)?;
        let count = records.len();
        store.extend(records).map_err(|source| PortalError::Record {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), count, "loaded fixture records");
    }
    Ok(store)
}

/// Read the records in one `.json` or `.jsonl` file.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<Value>, PortalError> {
    let path = path.as_ref();
    if extension(path) == Some("jsonl") {
        let file = fs::File::open(path).map_err(|e| io_error(path, e))?;
        return read_jsonl(path, BufReader::new(file));
    }

    let text = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    let value: Value = serde_json::from_str(&text).map_err(|e| PortalError::Parse {
        path: path.display().to_string(),
        line: e.line(),
        message: e.to_string(),
    })?;
    Ok(match value {
        Value::Array(records) => records,
        Value::Object(mut bundle) if bundle.get("records").is_some_and(Value::is_array) => {
            match bundle.remove("records") {
                Some(Value::Array(records)) => records,
                _ => Vec::new(),
            }
        }
        record => vec![record],
    })
}

fn read_jsonl(path: &Path, reader: impl BufRead) -> Result<Vec<Value>, PortalError> {
    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| io_error(path, e))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let record = serde_json::from_str(trimmed).map_err(|e| PortalError::Parse {
            path: path.display().to_string(),
            line: line_no + 1,
            message: e.to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

fn is_record_file(path: &Path) -> bool {
    matches!(extension(path), Some("json" | "jsonl"))
}

fn io_error(path: &Path, err: std::io::Error) -> PortalError {
    PortalError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}
