//! JSON memory files under the persona's `memory_data/` directory.

use crate::error::MemoryError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Read `path`, or return `T::default()` when the file does not exist yet.
pub(crate) fn read_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, MemoryError> {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(source) => {
            return Err(MemoryError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&json).map_err(|source| MemoryError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Pretty-print `value` to `path` atomically, creating parent directories.
pub(crate) fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), MemoryError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| MemoryError::Io { path, source }
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| MemoryError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json).map_err(io_err(&tmp_path))?;
    std::fs::rename(&tmp_path, path).map_err(io_err(path))
}

/// Append `records` to the JSON array stored at `path`.
pub(crate) fn append_records<T: Serialize + DeserializeOwned>(
    path: &Path,
    records: Vec<T>,
) -> Result<usize, MemoryError> {
    let mut existing: Vec<T> = read_or_default(path)?;
    let added = records.len();
    existing.extend(records);
    write_atomic(path, &existing)?;
    Ok(added)
}
