//! Client for the remote review-classification backend.
//!
//! Every backend capability is exposed as one fallible operation. Calls are
//! single-shot: no retry, no configured timeout. Callers surface the error
//! message inline and let the user re-trigger manually.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::charts::ColorScheme;

/// Errors surfaced by the backend API client
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Login failed: {0}")]
    Auth(String),

    #[error("Registration rejected: {0}")]
    Validation(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Classification failed: {0}")]
    Classification(String),

    #[error("Feedback rejected: {0}")]
    Feedback(String),

    #[error("Report generation failed: {0}")]
    Report(String),

    /// The server has no uploaded data for the requested report. The caller
    /// must translate this into a redirect to the import page.
    #[error("No uploaded data available on the server")]
    NoReportData,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Authenticated user record returned by the login endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Registration form payload (confirmation is validated before this is built)
#[derive(Debug, Clone, Serialize)]
pub struct RegisterPayload {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub dob: String,
    pub password: String,
}

/// Handle for a review file accepted by the upload endpoint.
///
/// The classify endpoint expects the upload response echoed back verbatim as
/// its request body, so unknown server-side fields (storage path and the
/// like) are carried along in `extra` rather than dropped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadedFile {
    #[serde(default)]
    pub id: i64,
    pub unique_id: String,
    #[serde(rename = "file_name", default)]
    pub name: String,
    #[serde(rename = "user_email", default)]
    pub owner_email: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// One dataset of a sentiment summary (counts plus optional decoration)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentDataset {
    #[serde(default)]
    pub data: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentages: Option<Vec<f64>>,
    #[serde(rename = "backgroundColor", default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Vec<String>>,
}

/// Chart-shaped sentiment summary as produced by the classifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentSummary {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub datasets: Vec<SentimentDataset>,
}

/// Full classification output (`classified_data` in the classify response).
///
/// Stored verbatim in the session store and read-only thereafter. Cluster
/// maps are keyed by the server's zero-based cluster id rendered as a string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassificationResult {
    pub sentiment_summary: SentimentSummary,
    #[serde(default)]
    pub review_text: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cluster_samples: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cluster_points: BTreeMap<String, Vec<(f64, f64)>>,
}

/// Server-side paths of a generated report, one per format
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportPaths {
    pub pdf_path: String,
    pub docx_path: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    user: Option<UserRecord>,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    classified_data: ClassificationResult,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct SystemFeedbackResponse {
    #[serde(default)]
    feedback: String,
}

/// HTTP client for the classification backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a client for the backend at `base_url` (trailing slash ignored)
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Absolute URL for a server-relative artifact path (report downloads)
    pub fn artifact_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Report endpoint URL with its query parameters applied
    pub fn report_url(&self, review_file_id: i64, scheme: &ColorScheme) -> String {
        format!(
            "{}?review_file_id={}&colorOptions={}",
            self.url("/generatereportdata/"),
            review_file_id,
            urlencoding::encode(&scheme.css_colors().join(","))
        )
    }

    /// Authenticate and return the user record.
    ///
    /// Non-2xx responses map to [`ApiError::Auth`] carrying the
    /// server-provided message when one exists.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserRecord, ApiError> {
        let response = self
            .http
            .post(self.url("/login/"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Auth(error_message(response).await));
        }

        let body: LoginResponse = response.json().await?;
        body.user
            .ok_or_else(|| ApiError::Auth("Server did not return a user record".to_string()))
    }

    /// Create a new account. Password confirmation is the caller's job.
    pub async fn register(&self, payload: &RegisterPayload) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.url("/register/"))
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Validation(error_message(response).await));
        }
        Ok(())
    }

    /// Upload a review file (multipart: file, user_email, file_name)
    pub async fn upload_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        owner_email: &str,
    ) -> Result<UploadedFile, ApiError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("user_email", owner_email.to_string())
            .text("file_name", file_name.to_string());

        let response = self
            .http
            .post(self.url("/upload-review-file/"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Upload(error_message(response).await));
        }
        Ok(response.json().await?)
    }

    /// Classify an uploaded file. The request body is the upload response
    /// echoed verbatim; the result is the response's `classified_data`.
    pub async fn classify(&self, uploaded: &UploadedFile) -> Result<ClassificationResult, ApiError> {
        let response = self
            .http
            .post(self.url("/classify-data/"))
            .json(uploaded)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Classification(error_message(response).await));
        }

        let body: ClassifyResponse = response.json().await?;
        Ok(body.classified_data)
    }

    /// Submit interface feedback for the given review file
    pub async fn interface_feedback(
        &self,
        review_file: &str,
        comment: &str,
    ) -> Result<String, ApiError> {
        let response = self
            .http
            .post(self.url("/interfacefeedback/"))
            .json(&serde_json::json!({ "review_file": review_file, "comment": comment }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Feedback(error_message(response).await));
        }
        let body: MessageResponse = response.json().await?;
        Ok(body.message)
    }

    /// Submit a star rating plus comment for the given review file
    pub async fn review_feedback(
        &self,
        review_file: &str,
        star_rating: u8,
        comment: &str,
    ) -> Result<String, ApiError> {
        let response = self
            .http
            .post(self.url("/reviewfeedback/"))
            .json(&serde_json::json!({
                "review_file": review_file,
                "star_rating": star_rating,
                "comment": comment,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::Feedback(error_message(response).await));
        }
        let body: MessageResponse = response.json().await?;
        Ok(body.message)
    }

    /// Fetch the system-generated feedback text
    pub async fn system_feedback(&self) -> Result<String, ApiError> {
        let response = self.http.get(self.url("/systemfeedback/")).send().await?;

        if !response.status().is_success() {
            return Err(ApiError::Feedback(error_message(response).await));
        }
        let body: SystemFeedbackResponse = response.json().await?;
        Ok(body.feedback)
    }

    /// Request report generation and return the artifact paths.
    ///
    /// HTTP 404 is the server's distinguished "no data" signal and maps to
    /// [`ApiError::NoReportData`].
    pub async fn generate_report(
        &self,
        review_file_id: i64,
        scheme: &ColorScheme,
    ) -> Result<ReportPaths, ApiError> {
        let response = self
            .http
            .get(self.report_url(review_file_id, scheme))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NoReportData);
        }
        if !response.status().is_success() {
            return Err(ApiError::Report(error_message(response).await));
        }
        Ok(response.json().await?)
    }
}

/// Pull the server-provided error message out of a failed response, falling
/// back to a generic description.
async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    match response.json::<Value>().await {
        Ok(body) => body
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("server returned {}", status)),
        Err(_) => format!("server returned {}", status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let client = ApiClient::new("http://127.0.0.1:8000/");
        assert_eq!(client.url("/login/"), "http://127.0.0.1:8000/login/");
    }

    #[test]
    fn report_url_carries_file_id_and_palette() {
        let client = ApiClient::new("http://127.0.0.1:8000");
        let url = client.report_url(42, &ColorScheme::Classic);
        assert!(url.starts_with("http://127.0.0.1:8000/generatereportdata/?"));
        assert!(url.contains("review_file_id=42"));
        assert!(url.contains("colorOptions=green%2Cgold%2Ccrimson"));
    }

    #[test]
    fn artifact_url_joins_relative_paths() {
        let client = ApiClient::new("http://127.0.0.1:8000");
        assert_eq!(
            client.artifact_url("/media/report_1.pdf"),
            "http://127.0.0.1:8000/media/report_1.pdf"
        );
        assert_eq!(
            client.artifact_url("media/report_1.docx"),
            "http://127.0.0.1:8000/media/report_1.docx"
        );
        assert_eq!(
            client.artifact_url("https://cdn.example.com/r.pdf"),
            "https://cdn.example.com/r.pdf"
        );
    }

    #[test]
    fn uploaded_file_round_trips_unknown_fields() {
        let raw = serde_json::json!({
            "id": 7,
            "unique_id": "abc-123",
            "file_name": "reviews.csv",
            "user_email": "a@b.com",
            "file": "/media/uploads/reviews.csv"
        });
        let uploaded: UploadedFile = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(uploaded.name, "reviews.csv");
        assert_eq!(
            uploaded.extra.get("file").and_then(Value::as_str),
            Some("/media/uploads/reviews.csv")
        );
        // The classify call must be able to echo the upload response verbatim.
        assert_eq!(serde_json::to_value(&uploaded).unwrap(), raw);
    }

    #[test]
    fn classification_result_tolerates_missing_optional_fields() {
        let raw = serde_json::json!({
            "sentiment_summary": {
                "labels": ["Positive", "Neutral", "Negative"],
                "datasets": [{ "data": [50.0, 30.0, 20.0] }]
            },
            "review_text": "sample"
        });
        let result: ClassificationResult = serde_json::from_value(raw.clone()).unwrap();
        assert!(result.sentiment_summary.datasets[0].percentages.is_none());
        assert!(result.cluster_samples.is_empty());
        assert_eq!(serde_json::to_value(&result).unwrap(), raw);
    }
}
