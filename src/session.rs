//! Durable session store for the workflow artifacts.
//!
//! The store is a string-keyed map of JSON values behind the
//! [`KeyValueStore`] trait, with a gzip-compressed file backend for real runs
//! and an in-memory backend for tests. [`SessionStore`] layers typed,
//! validated accessors on top: an entry that fails to deserialize is
//! discarded and reported as absent rather than crashing a page.
//!
//! `clear()` wipes ALL persisted artifacts (session, uploaded file,
//! classification result, comparison pair, color scheme); logout relies on
//! this clear-all contract.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{ClassificationResult, UploadedFile, UserRecord};
use crate::charts::ColorScheme;

pub const KEY_USER: &str = "user";
pub const KEY_SESSION_TOKEN: &str = "session_token";
pub const KEY_UPLOAD_FILE: &str = "uploadFile";
pub const KEY_CLASSIFICATION: &str = "sentiment_summary";
pub const KEY_COMPARE_FIRST: &str = "classifyResponse1";
pub const KEY_COMPARE_SECOND: &str = "classifyResponse2";
pub const KEY_COLOR_OPTIONS: &str = "colorOptions";

/// Snapshot format version; a mismatch on load degrades to an empty store
const STORE_VERSION: u32 = 1;

/// Key-value persistence backing the session store.
///
/// Last-write-wins, no transactions; one interactive instance per backing
/// store is assumed.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value);
    fn remove(&self, key: &str) -> Option<Value>;
    fn clear(&self);
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    saved_at: DateTime<Utc>,
    entries: HashMap<String, Value>,
}

/// Durable backend: the whole map is written as gzip-compressed JSON after
/// every mutation. Persistence failures are logged and swallowed; the
/// in-memory view stays authoritative for the life of the process.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, Value>>,
}

impl FileStore {
    /// Open the store at `path`, loading the existing snapshot when present.
    /// A corrupt or version-mismatched snapshot starts empty.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            match Self::load(&path) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("discarding unreadable state file {}: {}", path.display(), e);
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn load(path: &Path) -> std::io::Result<HashMap<String, Value>> {
        let file = File::open(path)?;
        let decoder = GzDecoder::new(file);
        let reader = std::io::BufReader::new(decoder);

        let snapshot: Snapshot = serde_json::from_reader(reader)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        if snapshot.version != STORE_VERSION {
            tracing::warn!(
                "state file {} has version {} (expected {}), starting empty",
                path.display(),
                snapshot.version,
                STORE_VERSION
            );
            return Ok(HashMap::new());
        }
        Ok(snapshot.entries)
    }

    fn persist(&self, entries: &HashMap<String, Value>) {
        let snapshot = Snapshot {
            version: STORE_VERSION,
            saved_at: Utc::now(),
            entries: entries.clone(),
        };

        let result = File::create(&self.path).and_then(|file| {
            let encoder = GzEncoder::new(file, Compression::default());
            let writer = std::io::BufWriter::new(encoder);
            serde_json::to_writer(writer, &snapshot)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
        });

        if let Err(e) = result {
            tracing::warn!("failed to persist state file {}: {}", self.path.display(), e);
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), value);
        self.persist(&entries);
    }

    fn remove(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().unwrap();
        let removed = entries.remove(key);
        if removed.is_some() {
            self.persist(&entries);
        }
        removed
    }

    fn clear(&self) {
        let mut entries = self.entries.lock().unwrap();
        entries.clear();
        self.persist(&entries);
    }
}

/// Volatile backend for tests and `--state-file`-less runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.entries.lock().unwrap().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) -> Option<Value> {
        self.entries.lock().unwrap().remove(key)
    }

    fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

/// Typed view over a [`KeyValueStore`] holding the workflow artifacts
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Self { inner }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::default()))
    }

    /// Validated read: an unparsable entry is dropped and reported absent
    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.inner.get(key)?;
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("discarding invalid stored entry {}: {}", key, e);
                self.inner.remove(key);
                None
            }
        }
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => self.inner.set(key, value),
            Err(e) => tracing::warn!("failed to serialize entry {}: {}", key, e),
        }
    }

    pub fn user(&self) -> Option<UserRecord> {
        self.read(KEY_USER)
    }

    pub fn set_user(&self, user: &UserRecord) {
        self.write(KEY_USER, user);
    }

    /// True when a user record is present (the Route Guard's predicate)
    pub fn authenticated(&self) -> bool {
        self.user().is_some()
    }

    pub fn session_token(&self) -> Option<String> {
        self.read(KEY_SESSION_TOKEN)
    }

    pub fn set_session_token(&self, token: &str) {
        self.write(KEY_SESSION_TOKEN, &token.to_string());
    }

    pub fn upload_file(&self) -> Option<UploadedFile> {
        self.read(KEY_UPLOAD_FILE)
    }

    /// Replaced wholesale on re-upload, never mutated in place
    pub fn set_upload_file(&self, file: &UploadedFile) {
        self.write(KEY_UPLOAD_FILE, file);
    }

    pub fn classification(&self) -> Option<ClassificationResult> {
        self.read(KEY_CLASSIFICATION)
    }

    pub fn set_classification(&self, result: &ClassificationResult) {
        self.write(KEY_CLASSIFICATION, result);
    }

    pub fn set_comparison(&self, first: &ClassificationResult, second: &ClassificationResult) {
        self.write(KEY_COMPARE_FIRST, first);
        self.write(KEY_COMPARE_SECOND, second);
    }

    /// Consume the transient comparison pair.
    ///
    /// Read-once by contract: both entries are removed before this returns,
    /// so a second call yields `None`.
    pub fn take_comparison(&self) -> Option<(ClassificationResult, ClassificationResult)> {
        let first = self.inner.remove(KEY_COMPARE_FIRST);
        let second = self.inner.remove(KEY_COMPARE_SECOND);

        let first: ClassificationResult = serde_json::from_value(first?).ok()?;
        let second: ClassificationResult = serde_json::from_value(second?).ok()?;
        Some((first, second))
    }

    /// The persisted palette, defaulting to Classic
    pub fn color_scheme(&self) -> ColorScheme {
        self.read(KEY_COLOR_OPTIONS).unwrap_or_default()
    }

    pub fn set_color_scheme(&self, scheme: ColorScheme) {
        self.write(KEY_COLOR_OPTIONS, &scheme);
    }

    /// Wipe everything: session, artifacts, palette. Logout calls this.
    pub fn clear(&self) {
        self.inner.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{SentimentDataset, SentimentSummary};
    use std::collections::BTreeMap;

    fn sample_result(text: &str) -> ClassificationResult {
        ClassificationResult {
            sentiment_summary: SentimentSummary {
                labels: vec!["Positive".into(), "Neutral".into(), "Negative".into()],
                datasets: vec![SentimentDataset {
                    data: vec![50.0, 30.0, 20.0],
                    percentages: Some(vec![50.0, 30.0, 20.0]),
                    background_color: None,
                }],
            },
            review_text: text.to_string(),
            cluster_samples: BTreeMap::new(),
            cluster_points: BTreeMap::new(),
        }
    }

    fn sample_user() -> UserRecord {
        UserRecord {
            id: 1,
            email: "ada@example.com".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
        }
    }

    #[test]
    fn user_round_trips() {
        let store = SessionStore::in_memory();
        assert!(store.user().is_none());
        assert!(!store.authenticated());

        store.set_user(&sample_user());
        assert_eq!(store.user().unwrap().email, "ada@example.com");
        assert!(store.authenticated());
    }

    #[test]
    fn clear_wipes_all_artifacts() {
        let store = SessionStore::in_memory();
        store.set_user(&sample_user());
        store.set_session_token("tok");
        store.set_classification(&sample_result("r"));
        store.set_color_scheme(ColorScheme::Ocean);

        store.clear();

        assert!(store.user().is_none());
        assert!(store.session_token().is_none());
        assert!(store.classification().is_none());
        // palette falls back to the default preset
        assert_eq!(store.color_scheme(), ColorScheme::Classic);
    }

    #[test]
    fn comparison_pair_is_read_once() {
        let store = SessionStore::in_memory();
        let first = sample_result("first");
        let second = sample_result("second");
        store.set_comparison(&first, &second);

        let taken = store.take_comparison().unwrap();
        assert_eq!(taken.0, first);
        assert_eq!(taken.1, second);

        assert!(store.take_comparison().is_none());
    }

    #[test]
    fn half_written_comparison_reads_as_absent() {
        let store = SessionStore::in_memory();
        store.write(KEY_COMPARE_FIRST, &sample_result("only one"));
        assert!(store.take_comparison().is_none());
        // the lone entry was consumed by the attempt
        assert!(store.read::<ClassificationResult>(KEY_COMPARE_FIRST).is_none());
    }

    #[test]
    fn invalid_entries_are_discarded_on_read() {
        let store = SessionStore::in_memory();
        store.inner.set(KEY_USER, Value::String("not a user".into()));
        assert!(store.user().is_none());
        // the bad entry is gone, not retried forever
        assert!(store.inner.get(KEY_USER).is_none());
    }

    #[test]
    fn color_scheme_persists_until_cleared() {
        let store = SessionStore::in_memory();
        assert_eq!(store.color_scheme(), ColorScheme::Classic);
        store.set_color_scheme(ColorScheme::Blossom);
        assert_eq!(store.color_scheme(), ColorScheme::Blossom);
    }
}
