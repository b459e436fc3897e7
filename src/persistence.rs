//! Persistence layer for document lists and store snapshots.
//!
//! Supports both JSON (human-readable) and bincode (efficient binary) formats.

use crate::error::{BenchError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Save format for snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    /// JSON format (human-readable, larger).
    Json,
    /// Bincode format (binary, compact).
    Bincode,
}

impl SaveFormat {
    /// Determine format from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => SaveFormat::Json,
            Some("bin") | Some("bincode") => SaveFormat::Bincode,
            _ => SaveFormat::Json, // Default to JSON
        }
    }
}

/// Save a value, choosing the format from the file extension.
pub fn save_snapshot<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    save_snapshot_with_format(value, path, SaveFormat::from_path(path))
}

/// Save a value with a specific format, replacing any existing file.
pub fn save_snapshot_with_format<T: Serialize + ?Sized>(
    value: &T,
    path: &Path,
    format: SaveFormat,
) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| BenchError::io(parent, e))?;
        }
    }

    let data = match format {
        SaveFormat::Json => serde_json::to_string_pretty(value)
            .map_err(|e| BenchError::Serialization(e.to_string()))?
            .into_bytes(),
        SaveFormat::Bincode => {
            let config = bincode::config::standard();
            bincode::serde::encode_to_vec(value, config)
                .map_err(|e| BenchError::Serialization(e.to_string()))?
        }
    };

    fs::write(path, &data).map_err(|e| BenchError::io(path, e))?;

    Ok(())
}

/// Load a value, choosing the format from the file extension.
pub fn load_snapshot<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(BenchError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "snapshot not found"),
        ));
    }

    load_snapshot_with_format(path, SaveFormat::from_path(path))
}

/// Load a value with a specific format.
pub fn load_snapshot_with_format<T: DeserializeOwned>(path: &Path, format: SaveFormat) -> Result<T> {
    let data = fs::read(path).map_err(|e| BenchError::io(path, e))?;

    let value = match format {
        SaveFormat::Json => serde_json::from_slice(&data)
            .map_err(|e| BenchError::Serialization(e.to_string()))?,
        SaveFormat::Bincode => {
            let config = bincode::config::standard();
            let (value, _): (T, usize) = bincode::serde::decode_from_slice(&data, config)
                .map_err(|e| BenchError::Serialization(e.to_string()))?;
            value
        }
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        vector: Vec<f32>,
    }

    fn sample() -> Sample {
        Sample {
            name: "bge-base-en".to_string(),
            vector: vec![0.25, -1.5, 3.0],
        }
    }

    #[test]
    fn test_save_and_load_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");

        save_snapshot(&sample(), &path).unwrap();
        let loaded: Sample = load_snapshot(&path).unwrap();
        assert_eq!(loaded, sample());

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("bge-base-en"));
    }

    #[test]
    fn test_save_and_load_bincode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("snapshot.bin");

        save_snapshot(&sample(), &path).unwrap();
        let loaded: Sample = load_snapshot(&path).unwrap();
        assert_eq!(loaded, sample());
        assert!(fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            SaveFormat::from_path(Path::new("test.json")),
            SaveFormat::Json
        );
        assert_eq!(
            SaveFormat::from_path(Path::new("test.bin")),
            SaveFormat::Bincode
        );
        assert_eq!(
            SaveFormat::from_path(Path::new("test.bincode")),
            SaveFormat::Bincode
        );
        assert_eq!(SaveFormat::from_path(Path::new("test")), SaveFormat::Json);
    }

    #[test]
    fn test_load_nonexistent() {
        let result: Result<Sample> = load_snapshot(Path::new("/nonexistent/store.json"));
        assert!(matches!(result, Err(BenchError::Io { .. })));
    }
}
