//! Data import page: select a review file, upload it, trigger
//! classification.
//!
//! The page is a state machine over five states. Classification is only
//! reachable from `Uploaded`, which serializes the upload-then-classify
//! sequence without any locking beyond the machine itself. A file whose
//! extension is not in the tabular allow-list never populates the selected
//! state and never reaches the network.

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::{escape_html, message_fragment, redirect_with_error};

/// Tabular formats accepted for upload, checked before any network call
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["csv", "xls", "xlsx"];

/// True when the file name carries an allow-listed extension
/// (case-insensitive)
pub fn allowed_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// States of the import page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportState {
    Empty,
    Selected,
    Uploading,
    Uploaded,
    Classifying,
}

/// The import page state machine.
///
/// Transition errors come back as inline messages (`Result<_, String>`);
/// the caller re-renders the page with the message, nothing crashes.
#[derive(Debug)]
pub struct ImportFlow {
    state: ImportState,
    selected: Option<String>,
    error: Option<String>,
}

impl Default for ImportFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportFlow {
    pub fn new() -> Self {
        Self {
            state: ImportState::Empty,
            selected: None,
            error: None,
        }
    }

    pub fn state(&self) -> ImportState {
        self.state
    }

    pub fn selected_file(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Select a file. A non-tabular extension sets the inline error and
    /// leaves the selected state untouched. Re-selecting while a request is
    /// in flight is rejected.
    pub fn select(&mut self, file_name: &str) -> Result<(), String> {
        match self.state {
            ImportState::Uploading | ImportState::Classifying => {
                return Err("Another request is still in progress.".to_string());
            }
            _ => {}
        }

        if !allowed_file(file_name) {
            let message = "Please upload a valid CSV or Excel file.".to_string();
            self.error = Some(message.clone());
            return Err(message);
        }

        self.selected = Some(file_name.to_string());
        self.state = ImportState::Selected;
        self.error = None;
        Ok(())
    }

    /// `Selected -> Uploading`
    pub fn start_upload(&mut self) -> Result<(), String> {
        if self.state != ImportState::Selected {
            return Err("Please select a file to upload.".to_string());
        }
        self.state = ImportState::Uploading;
        self.error = None;
        Ok(())
    }

    /// `Uploading -> Uploaded`
    pub fn upload_succeeded(&mut self) {
        self.state = ImportState::Uploaded;
        self.error = None;
    }

    /// `Uploading -> Selected`, keeping the selection so the user can retry
    pub fn upload_failed(&mut self, message: impl Into<String>) {
        self.state = ImportState::Selected;
        self.error = Some(message.into());
    }

    /// Classification is enabled only after a successful upload
    pub fn can_classify(&self) -> bool {
        self.state == ImportState::Uploaded
    }

    /// `Uploaded -> Classifying`
    pub fn start_classify(&mut self) -> Result<(), String> {
        if !self.can_classify() {
            return Err("Classification is only available after a successful upload.".to_string());
        }
        self.state = ImportState::Classifying;
        self.error = None;
        Ok(())
    }

    /// `Classifying -> Uploaded`; the upload stays usable for report and
    /// feedback, and a fresh classify remains possible
    pub fn classify_succeeded(&mut self) {
        self.state = ImportState::Uploaded;
        self.error = None;
    }

    /// `Classifying -> Uploaded`, with the error shown inline
    pub fn classify_failed(&mut self, message: impl Into<String>) {
        self.state = ImportState::Uploaded;
        self.error = Some(message.into());
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[derive(Debug, Deserialize)]
pub struct ImportPageQuery {
    pub error: Option<String>,
    pub uploaded: Option<String>,
}

/// Serve the import page with the machine's current state injected
pub async fn serve_import(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ImportPageQuery>,
) -> Html<String> {
    let flow = state.import.lock().unwrap();

    let status = match (flow.state(), flow.selected_file()) {
        (ImportState::Uploaded, Some(name)) | (ImportState::Classifying, Some(name)) => {
            format!("<p>Uploaded: <strong>{}</strong></p>", escape_html(name))
        }
        (ImportState::Selected, Some(name)) => {
            format!("<p>Selected: <strong>{}</strong></p>", escape_html(name))
        }
        _ => "<p>No file uploaded yet.</p>".to_string(),
    };

    let mut notice = message_fragment(&query.error);
    if notice.is_empty() {
        if let Some(error) = flow.error() {
            notice = format!(r#"<p class="error">{}</p>"#, escape_html(error));
        } else if query.uploaded.is_some() {
            notice = r#"<p class="success">File uploaded. Ready to classify.</p>"#.to_string();
        }
    }

    let classify_attr = if flow.can_classify() { "" } else { "disabled" };

    let page = include_str!("./static/import.html")
        .replace("<!--STATUS-->", &status)
        .replace("<!--MESSAGE-->", &notice)
        .replace("{{classify_disabled}}", classify_attr);
    Html(page)
}

/// Handle the upload action: validate the selection, push the file to the
/// backend, persist the uploaded-file handle.
pub async fn handle_upload(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let mut file_name = None;
    let mut bytes = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => {
                file_name = field.file_name().map(str::to_string);
                match field.bytes().await {
                    Ok(data) => bytes = Some(data.to_vec()),
                    Err(e) => {
                        return redirect_with_error("/import", &format!("Upload failed: {}", e))
                    }
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => return redirect_with_error("/import", &format!("Upload failed: {}", e)),
        }
    }

    let (file_name, bytes) = match (file_name, bytes) {
        (Some(name), Some(bytes)) if !name.is_empty() => (name, bytes),
        _ => return redirect_with_error("/import", "Please select a file to upload."),
    };

    let owner_email = match state.store.user() {
        Some(user) => user.email,
        None => return Redirect::to("/login").into_response(),
    };

    // Selection check and in-flight gating happen before the network call
    {
        let mut flow = state.import.lock().unwrap();
        if let Err(message) = flow.select(&file_name) {
            return redirect_with_error("/import", &message);
        }
        if let Err(message) = flow.start_upload() {
            return redirect_with_error("/import", &message);
        }
    }

    match state.api.upload_file(&file_name, bytes, &owner_email).await {
        Ok(uploaded) => {
            state.store.set_upload_file(&uploaded);
            state.import.lock().unwrap().upload_succeeded();
            tracing::info!("uploaded review file {}", uploaded.unique_id);
            Redirect::to("/import?uploaded=true").into_response()
        }
        Err(e) => {
            let message = e.to_string();
            state.import.lock().unwrap().upload_failed(message.clone());
            redirect_with_error("/import", &message)
        }
    }
}

/// Handle the classify action: only reachable from `Uploaded`; on success
/// the result is persisted verbatim and the user lands on the
/// visualization.
pub async fn handle_classify(State(state): State<Arc<AppState>>) -> Response {
    let uploaded = match state.store.upload_file() {
        Some(uploaded) => uploaded,
        None => return redirect_with_error("/import", "Please upload a file first."),
    };

    {
        let mut flow = state.import.lock().unwrap();
        if let Err(message) = flow.start_classify() {
            return redirect_with_error("/import", &message);
        }
    }

    match state.api.classify(&uploaded).await {
        Ok(result) => {
            state.store.set_classification(&result);
            state.import.lock().unwrap().classify_succeeded();
            Redirect::to("/visualization").into_response()
        }
        Err(e) => {
            let message = e.to_string();
            state.import.lock().unwrap().classify_failed(message.clone());
            redirect_with_error("/import", &message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_every_non_tabular_extension() {
        for name in [
            "reviews.txt",
            "reviews.pdf",
            "reviews.exe",
            "reviews.csv.bak",
            "reviews",
            "archive.tar.gz",
        ] {
            let mut flow = ImportFlow::new();
            assert!(flow.select(name).is_err(), "{} should be rejected", name);
            assert!(flow.selected_file().is_none());
            assert_eq!(flow.state(), ImportState::Empty);
            assert!(flow.error().is_some());
        }
    }

    #[test]
    fn accepts_tabular_extensions_case_insensitively() {
        for name in ["reviews.csv", "reviews.XLS", "Reviews.XlSx"] {
            let mut flow = ImportFlow::new();
            assert!(flow.select(name).is_ok());
            assert_eq!(flow.selected_file(), Some(name));
            assert_eq!(flow.state(), ImportState::Selected);
        }
    }

    #[test]
    fn classify_is_gated_on_a_successful_upload() {
        let mut flow = ImportFlow::new();
        assert!(!flow.can_classify());
        assert!(flow.start_classify().is_err());

        flow.select("reviews.csv").unwrap();
        assert!(!flow.can_classify());

        flow.start_upload().unwrap();
        assert!(!flow.can_classify());
        assert_eq!(flow.state(), ImportState::Uploading);

        flow.upload_succeeded();
        assert!(flow.can_classify());
        flow.start_classify().unwrap();
        assert_eq!(flow.state(), ImportState::Classifying);
    }

    #[test]
    fn upload_failure_returns_to_selected_with_error() {
        let mut flow = ImportFlow::new();
        flow.select("reviews.csv").unwrap();
        flow.start_upload().unwrap();
        flow.upload_failed("server down");

        assert_eq!(flow.state(), ImportState::Selected);
        assert_eq!(flow.selected_file(), Some("reviews.csv"));
        assert_eq!(flow.error(), Some("server down"));
        // retry is possible
        assert!(flow.start_upload().is_ok());
    }

    #[test]
    fn classify_failure_returns_to_uploaded_with_error() {
        let mut flow = ImportFlow::new();
        flow.select("reviews.csv").unwrap();
        flow.start_upload().unwrap();
        flow.upload_succeeded();
        flow.start_classify().unwrap();
        flow.classify_failed("model unavailable");

        assert_eq!(flow.state(), ImportState::Uploaded);
        assert!(flow.can_classify());
        assert_eq!(flow.error(), Some("model unavailable"));
    }

    #[test]
    fn selection_is_blocked_while_a_request_is_in_flight() {
        let mut flow = ImportFlow::new();
        flow.select("reviews.csv").unwrap();
        flow.start_upload().unwrap();
        assert!(flow.select("other.csv").is_err());
        assert_eq!(flow.selected_file(), Some("reviews.csv"));
    }

    #[test]
    fn reselecting_replaces_the_file_wholesale() {
        let mut flow = ImportFlow::new();
        flow.select("first.csv").unwrap();
        flow.select("second.xlsx").unwrap();
        assert_eq!(flow.selected_file(), Some("second.xlsx"));
    }
}
