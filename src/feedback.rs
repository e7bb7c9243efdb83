//! Feedback page: interface feedback (free text), review feedback (star
//! rating plus comment), and the read-only system-generated feedback view.
//!
//! Both submission kinds require an uploaded review file; without one the
//! user is sent to the import page. Validation happens before any network
//! call and failures come back as inline messages.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::{escape_html, message_fragment, redirect_with_error};

/// The two submission kinds offered by the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Interface,
    Review,
}

/// Interface feedback needs a non-empty comment
pub fn validate_interface(comment: &str) -> Result<(), String> {
    if comment.trim().is_empty() {
        return Err("Please enter your feedback before submitting.".to_string());
    }
    Ok(())
}

/// Review feedback needs a star rating between 1 and 5 and a non-empty
/// comment
pub fn validate_review(star_rating: u8, comment: &str) -> Result<(), String> {
    if !(1..=5).contains(&star_rating) {
        return Err("Please choose a star rating between 1 and 5.".to_string());
    }
    if comment.trim().is_empty() {
        return Err("Please enter your feedback before submitting.".to_string());
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct FeedbackPageQuery {
    pub view: Option<String>,
    pub error: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InterfaceFeedbackForm {
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewFeedbackForm {
    pub star_rating: u8,
    pub comment: String,
}

/// Serve the feedback page. `?view=system` additionally fetches and shows
/// the system-generated feedback text.
pub async fn serve_feedback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedbackPageQuery>,
) -> Html<String> {
    let mut notice = message_fragment(&query.error);
    if notice.is_empty() {
        if let Some(message) = &query.message {
            notice = format!(r#"<p class="success">{}</p>"#, escape_html(message));
        }
    }

    let system = if query.view.as_deref() == Some("system") {
        match state.api.system_feedback().await {
            Ok(text) => format!(
                "<h2>System Feedback</h2>\n<p>{}</p>",
                escape_html(&text)
            ),
            Err(e) => format!(
                r#"<p class="error">Could not load system feedback: {}</p>"#,
                escape_html(&e.to_string())
            ),
        }
    } else {
        String::new()
    };

    let page = include_str!("./static/feedback.html")
        .replace("<!--MESSAGE-->", &notice)
        .replace("<!--SYSTEM-->", &system);
    Html(page)
}

/// Submit interface feedback for the uploaded review file
pub async fn handle_interface(
    State(state): State<Arc<AppState>>,
    Form(form): Form<InterfaceFeedbackForm>,
) -> Response {
    let uploaded = match state.store.upload_file() {
        Some(uploaded) => uploaded,
        None => return Redirect::to("/import").into_response(),
    };

    if let Err(message) = validate_interface(&form.comment) {
        return redirect_with_error("/feedback", &message);
    }

    match state
        .api
        .interface_feedback(&uploaded.unique_id, form.comment.trim())
        .await
    {
        Ok(message) => {
            let message = if message.is_empty() {
                "Thank you for your feedback.".to_string()
            } else {
                message
            };
            Redirect::to(&format!(
                "/feedback?message={}",
                urlencoding::encode(&message)
            ))
            .into_response()
        }
        Err(e) => redirect_with_error("/feedback", &e.to_string()),
    }
}

/// Submit a star rating plus comment for the uploaded review file
pub async fn handle_review(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ReviewFeedbackForm>,
) -> Response {
    let uploaded = match state.store.upload_file() {
        Some(uploaded) => uploaded,
        None => return Redirect::to("/import").into_response(),
    };

    if let Err(message) = validate_review(form.star_rating, &form.comment) {
        return redirect_with_error("/feedback", &message);
    }

    match state
        .api
        .review_feedback(&uploaded.unique_id, form.star_rating, form.comment.trim())
        .await
    {
        Ok(message) => {
            let message = if message.is_empty() {
                "Thank you for your feedback.".to_string()
            } else {
                message
            };
            Redirect::to(&format!(
                "/feedback?message={}",
                urlencoding::encode(&message)
            ))
            .into_response()
        }
        Err(e) => redirect_with_error("/feedback", &e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interface_feedback_requires_a_comment() {
        assert!(validate_interface("").is_err());
        assert!(validate_interface("   \t\n").is_err());
        assert!(validate_interface("works well").is_ok());
    }

    #[test]
    fn review_feedback_bounds_the_star_rating() {
        assert!(validate_review(0, "fine").is_err());
        assert!(validate_review(6, "fine").is_err());
        for stars in 1..=5 {
            assert!(validate_review(stars, "fine").is_ok());
        }
    }

    #[test]
    fn review_feedback_requires_a_comment_too() {
        assert!(validate_review(5, "").is_err());
        assert!(validate_review(5, "  ").is_err());
    }
}
