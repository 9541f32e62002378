// =============================================================================
// dataset.rs: TABLES ON DISK
// =============================================================================
//
// Whitelists, input samples, diagnosed output and training sets are all
// tables of records. On disk they are either a JSON array of objects or,
// when the path ends in `.jsonl` / `.ndjson`, one JSON object per line.
// Row order is preserved in both directions.
// =============================================================================

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::DatasetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Json,
    JsonLines,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext)
                if ext.eq_ignore_ascii_case("jsonl") || ext.eq_ignore_ascii_case("ndjson") =>
            {
                TableFormat::JsonLines
            }
            _ => TableFormat::Json,
        }
    }
}

/// Read every record of the table at `path`, in order.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, DatasetError> {
    let raw = fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let records = match TableFormat::from_path(path) {
        TableFormat::Json => serde_json::from_str::<Vec<T>>(&raw).map_err(|source| {
            DatasetError::Parse {
                path: path.to_path_buf(),
                line: source.line(),
                source,
            }
        })?,
        TableFormat::JsonLines => {
            let mut records = Vec::new();
            for (idx, line) in raw.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let record = serde_json::from_str(line).map_err(|source| DatasetError::Parse {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    source,
                })?;
                records.push(record);
            }
            records
        }
    };

    debug!(path = %path.display(), rows = records.len(), "Table loaded");
    Ok(records)
}

/// Write `records` to `path` in the format its extension asks for.
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<(), DatasetError> {
    let body = match TableFormat::from_path(path) {
        TableFormat::Json => serde_json::to_string_pretty(records).map_err(|source| {
            DatasetError::Serialize {
                path: path.to_path_buf(),
                source,
            }
        })?,
        TableFormat::JsonLines => {
            let mut body = String::new();
            for record in records {
                let line = serde_json::to_string(record).map_err(|source| {
                    DatasetError::Serialize {
                        path: path.to_path_buf(),
                        source,
                    }
                })?;
                body.push_str(&line);
                body.push('\n');
            }
            body
        }
    };

    write_file(path, &body)?;
    debug!(path = %path.display(), rows = records.len(), "Table written");
    Ok(())
}

/// Write a single JSON document (reports, training sets).
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), DatasetError> {
    let body = serde_json::to_string_pretty(value).map_err(|source| DatasetError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    write_file(path, &body)
}

fn write_file(path: &Path, body: &str) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| DatasetError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, body).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}
