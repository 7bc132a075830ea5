//! JSON-backed submission store
//!
//! The whole store is one JSON object on disk mapping a timestamp to the
//! fields of one submission:
//!
//! ```json
//! {
//!     "2024-05-01 12:30:45.123456": { "name": "Ann", "age": "30" }
//! }
//! ```
//!
//! Every insert reads the whole document, adds one record and writes the
//! document back through a temporary sibling file that is renamed over the
//! store. A single [`JsonStore`] must own a given path; concurrent writers
//! lose updates.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Map, Value};

use crate::Result;

/// Timestamp layout used for record keys
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Field name to value
pub type Fields = Map<String, Value>;

/// Timestamp key to fields
pub type Records = Map<String, Value>;

/// Format a record key
pub fn timestamp(at: DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Record key for the current moment
pub fn timestamp_now() -> String {
    timestamp(Local::now())
}

/// JSON document store at a fixed path
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record currently on disk.
    ///
    /// A missing file is an empty store. A file that is not a JSON object is
    /// logged and also read as empty; it stays on disk until the next insert
    /// replaces it.
    ///
    /// # Errors
    ///
    /// Fails only when the file exists but cannot be read.
    pub fn load(&self) -> Result<Records> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Records::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<Value>(&data) {
            Ok(Value::Object(records)) => Ok(records),
            Ok(other) => {
                tracing::error!(
                    path = %self.path.display(),
                    kind = json_kind(&other),
                    "store is not a JSON object, starting from an empty store"
                );
                Ok(Records::new())
            }
            Err(e) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "store is corrupted or empty, starting from an empty store"
                );
                Ok(Records::new())
            }
        }
    }

    /// Add one record under `key` and rewrite the store.
    ///
    /// An existing record with the same key is replaced.
    pub fn insert(&self, key: &str, fields: Fields) -> Result<()> {
        let mut records = self.load()?;
        records.insert(key.to_string(), Value::Object(fields));
        self.write(&records)
    }

    fn write(&self, records: &Records) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut buf = Vec::with_capacity(256);
        let mut ser =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        records.serialize(&mut ser)?;

        let tmp = self.temp_path();
        let result = fs::File::create(&tmp)
            .and_then(|mut file| {
                file.write_all(&buf)?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&tmp, &self.path));

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_timestamp_format() {
        let at = Local
            .with_ymd_and_hms(2024, 5, 1, 9, 5, 3)
            .unwrap()
            + chrono::Duration::microseconds(42);
        assert_eq!(timestamp(at), "2024-05-01 09:05:03.000042");
        assert_eq!(timestamp_now().len(), "2024-05-01 09:05:03.000042".len());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("data.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_empty_object_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, "{}").unwrap();
        assert!(JsonStore::new(&path).load().unwrap().is_empty());
    }

    #[test]
    fn test_insert_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage").join("data.json");
        let store = JsonStore::new(&path);

        store
            .insert("2024-05-01 12:00:00.000001", fields(json!({"name": "Ann", "age": "30"})))
            .unwrap();

        let on_disk: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(
            on_disk,
            json!({"2024-05-01 12:00:00.000001": {"name": "Ann", "age": "30"}})
        );
        assert!(!dir.path().join("storage").join("data.json.tmp").exists());
    }

    #[test]
    fn test_insert_keeps_previous_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("data.json"));

        store.insert("t1", fields(json!({"a": "1"}))).unwrap();
        store.insert("t2", fields(json!({"b": "2"}))).unwrap();
        store.insert("t1", fields(json!({"a": "3"}))).unwrap();

        let records = store.load().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records["t1"], json!({"a": "3"}));
        assert_eq!(records["t2"], json!({"b": "2"}));
    }

    #[test]
    fn test_corrupt_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, "{bad").unwrap();
        let store = JsonStore::new(&path);

        assert!(store.load().unwrap().is_empty());
        // Corrupt content is left alone until the next insert
        assert_eq!(fs::read_to_string(&path).unwrap(), "{bad");

        store.insert("t1", fields(json!({"name": "Ann"}))).unwrap();
        let on_disk: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(on_disk, json!({"t1": {"name": "Ann"}}));
    }

    #[test]
    fn test_non_object_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(JsonStore::new(&path).load().unwrap().is_empty());
    }

    #[test]
    fn test_pretty_output_keeps_unicode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let store = JsonStore::new(&path);

        store.insert("t1", fields(json!({"city": "Kyiv – Київ"}))).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("Київ"));
        assert!(text.contains("\n    \"t1\": {\n        \"city\""));
    }

    #[test]
    fn test_unreadable_store_fails() {
        let dir = tempfile::tempdir().unwrap();
        // A directory at the store path cannot be read as a file
        let path = dir.path().join("data.json");
        fs::create_dir(&path).unwrap();

        let store = JsonStore::new(&path);
        assert!(store.load().is_err());
        assert!(store.insert("t1", Fields::new()).is_err());
    }
}
