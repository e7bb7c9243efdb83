//! Report page: request server-side report generation for the uploaded
//! review file and present the PDF and DOCX download links.
//!
//! Generation needs an uploaded file; without one the page redirects to the
//! import page instead of calling the backend. The backend's "no data"
//! answer is treated the same way.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::api::{ApiError, UploadedFile};
use crate::app::AppState;
use crate::auth::{escape_html, message_fragment, redirect_with_error};
use crate::session::SessionStore;

/// What the report page should do for the current store state
#[derive(Debug, Clone, PartialEq)]
pub enum ReportAction {
    /// A file is uploaded; generation may proceed for it
    Generate(UploadedFile),
    /// Nothing uploaded; the page is unreachable
    RedirectToImport,
}

/// Decide the page's action from the store alone, no network involved
pub fn next_action(store: &SessionStore) -> ReportAction {
    match store.upload_file() {
        Some(uploaded) => ReportAction::Generate(uploaded),
        None => ReportAction::RedirectToImport,
    }
}

#[derive(Debug, Deserialize)]
pub struct ReportPageQuery {
    pub error: Option<String>,
    pub pdf: Option<String>,
    pub docx: Option<String>,
}

/// Serve the report page. Freshly generated artifact paths arrive via the
/// query string and are rendered as absolute download links.
pub async fn serve_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportPageQuery>,
) -> Response {
    let uploaded = match next_action(&state.store) {
        ReportAction::Generate(uploaded) => uploaded,
        ReportAction::RedirectToImport => return Redirect::to("/import").into_response(),
    };

    let links = match (&query.pdf, &query.docx) {
        (Some(pdf), Some(docx)) => format!(
            "<ul>\n<li><a href=\"{}\">Download PDF</a></li>\n<li><a href=\"{}\">Download DOCX</a></li>\n</ul>",
            escape_html(&state.api.artifact_url(pdf)),
            escape_html(&state.api.artifact_url(docx))
        ),
        _ => "<p>No report generated yet.</p>".to_string(),
    };

    let scheme = state.store.color_scheme();
    let page = include_str!("./static/report.html")
        .replace("<!--MESSAGE-->", &message_fragment(&query.error))
        .replace("<!--FILE-->", &escape_html(&uploaded.name))
        .replace("<!--PALETTE-->", scheme.label())
        .replace("<!--LINKS-->", &links);
    Html(page).into_response()
}

/// Handle the generate action: call the backend with the uploaded file's id
/// and the persisted palette, then land back on the page with the links.
pub async fn handle_generate(State(state): State<Arc<AppState>>) -> Response {
    let uploaded = match next_action(&state.store) {
        ReportAction::Generate(uploaded) => uploaded,
        ReportAction::RedirectToImport => return Redirect::to("/import").into_response(),
    };

    let scheme = state.store.color_scheme();
    match state.api.generate_report(uploaded.id, &scheme).await {
        Ok(paths) => {
            tracing::info!("report generated for file {}", uploaded.unique_id);
            Redirect::to(&format!(
                "/report?pdf={}&docx={}",
                urlencoding::encode(&paths.pdf_path),
                urlencoding::encode(&paths.docx_path)
            ))
            .into_response()
        }
        // The server has no data for this file; same destination as an
        // empty store
        Err(ApiError::NoReportData) => Redirect::to("/import").into_response(),
        Err(e) => redirect_with_error("/report", &e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_redirects_to_import() {
        let store = SessionStore::in_memory();
        assert_eq!(next_action(&store), ReportAction::RedirectToImport);
    }

    #[test]
    fn uploaded_file_enables_generation() {
        let store = SessionStore::in_memory();
        let uploaded = UploadedFile {
            id: 9,
            unique_id: "u-9".into(),
            name: "reviews.csv".into(),
            owner_email: "ada@example.com".into(),
            extra: serde_json::Map::new(),
        };
        store.set_upload_file(&uploaded);
        assert_eq!(next_action(&store), ReportAction::Generate(uploaded));
    }
}
