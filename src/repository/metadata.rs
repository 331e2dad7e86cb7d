//! JSON metadata sidecar recording every downloaded flyer.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ProspektError, Result};
use crate::models::FlyerRecord;

/// Default metadata filename inside the output directory.
pub const METADATA_FILENAME: &str = "prospekte_metadata.json";

/// Ordered record of previously downloaded flyers.
pub trait MetadataStore: Send {
    /// All records in the order they were appended.
    fn records(&self) -> &[FlyerRecord];

    /// Append a record and persist the store.
    fn append(&mut self, record: FlyerRecord) -> Result<()>;
}

/// Metadata store backed by a single pretty-printed JSON array.
#[derive(Debug)]
pub struct JsonMetadataStore {
    path: PathBuf,
    records: Vec<FlyerRecord>,
}

impl JsonMetadataStore {
    /// Load the store at `path`. A missing file is an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No metadata store at {}, starting empty", path.display());
                return Ok(Self {
                    path,
                    records: Vec::new(),
                });
            }
            Err(source) => return Err(ProspektError::Store { path, source }),
        };

        let records: Vec<FlyerRecord> = match serde_json::from_str(&contents) {
            Ok(records) => records,
            Err(source) => return Err(ProspektError::CorruptStore { path, source }),
        };

        debug!(
            "Loaded {} records from {}",
            records.len(),
            path.display()
        );
        Ok(Self { path, records })
    }

    /// Load `<output_dir>/prospekte_metadata.json`.
    pub fn in_dir(output_dir: &Path) -> Result<Self> {
        Self::load(output_dir.join(METADATA_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write all records to a sibling temp file, then rename it over the target.
    fn persist(&self) -> Result<()> {
        let store_err = |source: std::io::Error| ProspektError::Store {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(store_err)?;

        let json = serde_json::to_string_pretty(&self.records)
            .map_err(|e| store_err(std::io::Error::other(e)))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(store_err)?;
        tmp.write_all(json.as_bytes()).map_err(store_err)?;
        tmp.as_file().sync_all().map_err(store_err)?;
        tmp.persist(&self.path).map_err(|e| store_err(e.error))?;
        Ok(())
    }
}

impl MetadataStore for JsonMetadataStore {
    fn records(&self) -> &[FlyerRecord] {
        &self.records
    }

    fn append(&mut self, record: FlyerRecord) -> Result<()> {
        self.records.push(record);
        if let Err(e) = self.persist() {
            self.records.pop();
            return Err(e);
        }
        Ok(())
    }
}

/// In-memory store, used when persistence is not wanted.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    records: Vec<FlyerRecord>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn records(&self) -> &[FlyerRecord] {
        &self.records
    }

    fn append(&mut self, record: FlyerRecord) -> Result<()> {
        self.records.push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FlyerDescriptor, FlyerType, Month};
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn sample(url: &str, hash: &str) -> FlyerRecord {
        FlyerRecord {
            url: url.to_string(),
            pdf_url: Some(format!("{}/flyer.pdf", url)),
            title: "Reisemagazin Juni 2025".to_string(),
            filename: "Aldi_Sued_Reisemagazin_Juni_2025.pdf".to_string(),
            filepath: PathBuf::from("/tmp/Aldi_Sued_Reisemagazin_Juni_2025.pdf"),
            content_hash: hash.to_string(),
            file_size: 1234,
            downloaded_at: Utc.with_ymd_and_hms(2025, 6, 2, 8, 30, 0).unwrap(),
            descriptor: FlyerDescriptor {
                flyer_type: FlyerType::TravelMagazine,
                calendar_week: None,
                month: Some(Month::June),
                year: Some(2025),
            },
        }
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let store = JsonMetadataStore::in_dir(dir.path()).unwrap();
        assert!(store.records().is_empty());
        assert_eq!(store.path(), dir.path().join(METADATA_FILENAME));
    }

    #[test]
    fn test_append_and_reload_round_trip() {
        let dir = tempdir().unwrap();
        let mut store = JsonMetadataStore::in_dir(dir.path()).unwrap();
        store.append(sample("https://a/1", "aaa")).unwrap();
        store.append(sample("https://a/2", "bbb")).unwrap();

        let reloaded = JsonMetadataStore::in_dir(dir.path()).unwrap();
        assert_eq!(reloaded.records(), store.records());
        assert_eq!(reloaded.records()[0].url, "https://a/1");
        assert_eq!(reloaded.records()[1].url, "https://a/2");
    }

    #[test]
    fn test_store_is_a_json_array() {
        let dir = tempdir().unwrap();
        let mut store = JsonMetadataStore::in_dir(dir.path()).unwrap();
        store.append(sample("https://a/1", "aaa")).unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 1);
        assert_eq!(array[0]["descriptor"]["type"], "travel-magazine");
        assert_eq!(array[0]["descriptor"]["month"], "june");
    }

    #[test]
    fn test_corrupt_file_fails_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(METADATA_FILENAME);
        std::fs::write(&path, "{not json").unwrap();
        let err = JsonMetadataStore::load(&path).unwrap_err();
        assert!(matches!(err, ProspektError::CorruptStore { .. }));
    }

    #[test]
    fn test_empty_file_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(METADATA_FILENAME);
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            JsonMetadataStore::load(&path),
            Err(ProspektError::CorruptStore { .. })
        ));
    }

    #[test]
    fn test_object_instead_of_array_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(METADATA_FILENAME);
        std::fs::write(&path, r#"{"url": "x"}"#).unwrap();
        assert!(matches!(
            JsonMetadataStore::load(&path),
            Err(ProspektError::CorruptStore { .. })
        ));
    }

    #[test]
    fn test_append_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let mut store = JsonMetadataStore::in_dir(&nested).unwrap();
        store.append(sample("https://a/1", "aaa")).unwrap();
        assert!(nested.join(METADATA_FILENAME).exists());
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempdir().unwrap();
        let mut store = JsonMetadataStore::in_dir(dir.path()).unwrap();
        store.append(sample("https://a/1", "aaa")).unwrap();
        store.append(sample("https://a/2", "bbb")).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_memory_store_appends() {
        let mut store = MemoryMetadataStore::new();
        store.append(sample("https://a/1", "aaa")).unwrap();
        assert_eq!(store.records().len(), 1);
    }
}
