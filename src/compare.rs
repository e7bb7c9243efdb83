//! Comparison page: two review files, uploaded and classified in sequence,
//! with the pair of results handed to the side-by-side visualization.
//!
//! Each slot runs the same machine as the import page; the submit button is
//! enabled only when both slots hold a valid selection. The two pipelines run
//! one after the other, and the pair is stored atomically only when both
//! classifications succeed.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::api::ClassificationResult;
use crate::app::AppState;
use crate::auth::{escape_html, message_fragment, redirect_with_error};
use crate::import_flow::{ImportFlow, ImportState};

/// The comparison page machine: two independent slots
#[derive(Debug, Default)]
pub struct CompareFlow {
    first: ImportFlow,
    second: ImportFlow,
}

impl CompareFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn first(&self) -> &ImportFlow {
        &self.first
    }

    pub fn second(&self) -> &ImportFlow {
        &self.second
    }

    pub fn select_first(&mut self, file_name: &str) -> Result<(), String> {
        self.first.select(file_name)
    }

    pub fn select_second(&mut self, file_name: &str) -> Result<(), String> {
        self.second.select(file_name)
    }

    /// Both slots selected and neither mid-request
    pub fn ready(&self) -> bool {
        self.first.state() == ImportState::Selected && self.second.state() == ImportState::Selected
    }

    pub fn reset(&mut self) {
        self.first.reset();
        self.second.reset();
    }
}

#[derive(Debug, Deserialize)]
pub struct ComparePageQuery {
    pub error: Option<String>,
}

/// Serve the comparison page
pub async fn serve_compare(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ComparePageQuery>,
) -> Html<String> {
    let flow = state.compare.lock().unwrap();

    let mut notice = message_fragment(&query.error);
    if notice.is_empty() {
        if let Some(error) = flow.first().error().or_else(|| flow.second().error()) {
            notice = format!(r#"<p class="error">{}</p>"#, escape_html(error));
        }
    }

    let slot_status = |flow: &ImportFlow| match flow.selected_file() {
        Some(name) => format!("<p>Selected: <strong>{}</strong></p>", escape_html(name)),
        None => "<p>No file selected.</p>".to_string(),
    };

    let page = include_str!("./static/compare.html")
        .replace("<!--MESSAGE-->", &notice)
        .replace("<!--FIRST_STATUS-->", &slot_status(flow.first()))
        .replace("<!--SECOND_STATUS-->", &slot_status(flow.second()));
    Html(page)
}

struct SlotSubmission {
    file_name: String,
    bytes: Vec<u8>,
}

/// Run one slot through upload and classify
async fn classify_slot(
    state: &AppState,
    submission: SlotSubmission,
    owner_email: &str,
) -> Result<ClassificationResult, String> {
    let uploaded = state
        .api
        .upload_file(&submission.file_name, submission.bytes, owner_email)
        .await
        .map_err(|e| e.to_string())?;
    tracing::info!("uploaded comparison file {}", uploaded.unique_id);

    state.api.classify(&uploaded).await.map_err(|e| e.to_string())
}

/// Handle the compare submission: both files upload and classify in
/// sequence; the first failure aborts and nothing is stored.
pub async fn handle_compare(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Response {
    let mut first = None;
    let mut second = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return redirect_with_error("/compare", &format!("Upload failed: {}", e)),
        };

        let slot = match field.name() {
            Some("file1") => &mut first,
            Some("file2") => &mut second,
            _ => continue,
        };

        let file_name = field.file_name().unwrap_or_default().to_string();
        match field.bytes().await {
            Ok(bytes) if !file_name.is_empty() => {
                *slot = Some(SlotSubmission {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            Ok(_) => {}
            Err(e) => return redirect_with_error("/compare", &format!("Upload failed: {}", e)),
        }
    }

    let (first, second) = match (first, second) {
        (Some(first), Some(second)) => (first, second),
        _ => return redirect_with_error("/compare", "Please select both files to compare."),
    };

    let owner_email = match state.store.user() {
        Some(user) => user.email,
        None => return Redirect::to("/login").into_response(),
    };

    // Both selections must validate before any network traffic
    {
        let mut flow = state.compare.lock().unwrap();
        flow.reset();
        if let Err(message) = flow.select_first(&first.file_name) {
            return redirect_with_error("/compare", &message);
        }
        if let Err(message) = flow.select_second(&second.file_name) {
            return redirect_with_error("/compare", &message);
        }
        debug_assert!(flow.ready());
    }

    let first_result = match classify_slot(&state, first, &owner_email).await {
        Ok(result) => result,
        Err(message) => {
            state.compare.lock().unwrap().reset();
            return redirect_with_error("/compare", &message);
        }
    };

    let second_result = match classify_slot(&state, second, &owner_email).await {
        Ok(result) => result,
        Err(message) => {
            state.compare.lock().unwrap().reset();
            return redirect_with_error("/compare", &message);
        }
    };

    state.store.set_comparison(&first_result, &second_result);
    state.compare.lock().unwrap().reset();
    Redirect::to("/visualization-compare").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_requires_both_slots_selected() {
        let mut flow = CompareFlow::new();
        assert!(!flow.ready());

        flow.select_first("a.csv").unwrap();
        assert!(!flow.ready());

        flow.select_second("b.xlsx").unwrap();
        assert!(flow.ready());
    }

    #[test]
    fn slots_validate_independently() {
        let mut flow = CompareFlow::new();
        flow.select_first("a.csv").unwrap();
        assert!(flow.select_second("b.pdf").is_err());
        assert!(!flow.ready());
        assert_eq!(flow.first().selected_file(), Some("a.csv"));
        assert!(flow.second().selected_file().is_none());
    }

    #[test]
    fn reset_clears_both_slots() {
        let mut flow = CompareFlow::new();
        flow.select_first("a.csv").unwrap();
        flow.select_second("b.csv").unwrap();
        flow.reset();
        assert!(!flow.ready());
        assert!(flow.first().selected_file().is_none());
    }
}
