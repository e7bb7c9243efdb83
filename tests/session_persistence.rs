//! The session store must survive a process restart: workflow artifacts
//! written through one [`FileStore`] instance have to be readable through a
//! fresh instance opened on the same file.

use std::sync::Arc;

use reviewlens::api::{SentimentDataset, SentimentSummary, UploadedFile, UserRecord};
use reviewlens::{ClassificationResult, ColorScheme, FileStore, SessionStore};
use std::collections::BTreeMap;

fn sample_user() -> UserRecord {
    UserRecord {
        id: 3,
        email: "grace@example.com".into(),
        first_name: "Grace".into(),
        last_name: "Hopper".into(),
    }
}

fn sample_upload() -> UploadedFile {
    serde_json::from_value(serde_json::json!({
        "id": 11,
        "unique_id": "f3c1",
        "file_name": "reviews.csv",
        "user_email": "grace@example.com",
        "file": "/media/uploads/reviews.csv"
    }))
    .unwrap()
}

fn sample_result() -> ClassificationResult {
    ClassificationResult {
        sentiment_summary: SentimentSummary {
            labels: vec!["Positive".into(), "Neutral".into(), "Negative".into()],
            datasets: vec![SentimentDataset {
                data: vec![12.0, 5.0, 3.0],
                percentages: Some(vec![60.0, 25.0, 15.0]),
                background_color: None,
            }],
        },
        review_text: "reviews.csv".into(),
        cluster_samples: BTreeMap::from([("0".to_string(), vec!["loved it".to_string()])]),
        cluster_points: BTreeMap::from([("0".to_string(), vec![(0.3, 1.2)])]),
    }
}

fn open_store(path: &std::path::Path) -> SessionStore {
    SessionStore::new(Arc::new(FileStore::open(path).unwrap()))
}

#[test]
fn artifacts_survive_a_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json.gz");

    {
        let store = open_store(&path);
        store.set_user(&sample_user());
        store.set_session_token("tok-123");
        store.set_upload_file(&sample_upload());
        store.set_classification(&sample_result());
        store.set_color_scheme(ColorScheme::Ocean);
    }

    let store = open_store(&path);
    assert_eq!(store.user().unwrap().first_name, "Grace");
    assert_eq!(store.session_token().unwrap(), "tok-123");
    assert_eq!(store.upload_file().unwrap(), sample_upload());
    assert_eq!(store.classification().unwrap(), sample_result());
    assert_eq!(store.color_scheme(), ColorScheme::Ocean);
}

#[test]
fn comparison_pair_stays_read_once_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json.gz");

    {
        let store = open_store(&path);
        store.set_comparison(&sample_result(), &sample_result());
    }

    // Pair written before the restart is still there exactly once
    let store = open_store(&path);
    assert!(store.take_comparison().is_some());
    assert!(store.take_comparison().is_none());

    // And the consumption itself persisted
    let store = open_store(&path);
    assert!(store.take_comparison().is_none());
}

#[test]
fn clear_persists_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json.gz");

    {
        let store = open_store(&path);
        store.set_user(&sample_user());
        store.clear();
    }

    let store = open_store(&path);
    assert!(store.user().is_none());
}

#[test]
fn corrupt_state_file_degrades_to_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json.gz");
    std::fs::write(&path, b"not gzip at all").unwrap();

    let store = open_store(&path);
    assert!(store.user().is_none());

    // The store is usable again after the discard
    store.set_session_token("fresh");
    let store = open_store(&path);
    assert_eq!(store.session_token().unwrap(), "fresh");
}

#[test]
fn version_mismatch_degrades_to_empty() {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json.gz");

    let snapshot = serde_json::json!({
        "version": 99,
        "saved_at": "2026-01-01T00:00:00Z",
        "entries": { "session_token": "stale" }
    });
    let file = std::fs::File::create(&path).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder
        .write_all(serde_json::to_vec(&snapshot).unwrap().as_slice())
        .unwrap();
    encoder.finish().unwrap();

    let store = open_store(&path);
    assert!(store.session_token().is_none());
}

#[test]
fn missing_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir.path().join("never-written.json.gz"));
    assert!(store.user().is_none());
    assert!(!store.authenticated());
}
