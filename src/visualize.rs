//! Visualization pages: five interchangeable views over a classification
//! result, with a palette switcher, plus the side-by-side comparison page.
//!
//! The single-result page reads the stored classification on every request
//! and serves its chart images from a dedicated PNG endpoint. The comparison
//! page consumes the transient result pair on first render, so its images
//! are inlined as base64 data URIs instead of fetched from an endpoint that
//! would find the store already empty.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;

use crate::api::ClassificationResult;
use crate::app::AppState;
use crate::auth::escape_html;
use crate::charts::{
    chart_slices, cluster_sections, render_bar_png, render_pie_png, render_scatter_png,
    scatter_series, text_rows, ColorScheme,
};

const CHART_WIDTH: u32 = 640;
const CHART_HEIGHT: u32 = 480;

/// The five views of a classification result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisualizationView {
    #[default]
    PieChart,
    BarGraph,
    TextFormat,
    ClusterText,
    ClusterPoints,
}

impl VisualizationView {
    pub const ALL: [VisualizationView; 5] = [
        VisualizationView::PieChart,
        VisualizationView::BarGraph,
        VisualizationView::TextFormat,
        VisualizationView::ClusterText,
        VisualizationView::ClusterPoints,
    ];

    pub fn as_param(&self) -> &'static str {
        match self {
            VisualizationView::PieChart => "pie",
            VisualizationView::BarGraph => "bar",
            VisualizationView::TextFormat => "text",
            VisualizationView::ClusterText => "clusters",
            VisualizationView::ClusterPoints => "points",
        }
    }

    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "pie" => Some(VisualizationView::PieChart),
            "bar" => Some(VisualizationView::BarGraph),
            "text" => Some(VisualizationView::TextFormat),
            "clusters" => Some(VisualizationView::ClusterText),
            "points" => Some(VisualizationView::ClusterPoints),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VisualizationView::PieChart => "Pie Chart",
            VisualizationView::BarGraph => "Bar Graph",
            VisualizationView::TextFormat => "Text Format",
            VisualizationView::ClusterText => "Cluster Samples",
            VisualizationView::ClusterPoints => "Cluster Points",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    pub view: Option<String>,
    pub palette: Option<String>,
}

/// Serve the single-result visualization page.
///
/// Without a stored classification the page is unreachable and the user is
/// sent to the import page. A `palette` query parameter persists the scheme
/// before rendering, so the report uses it too.
pub async fn serve_visualization(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> Response {
    let result = match state.store.classification() {
        Some(result) => result,
        None => return Redirect::to("/import").into_response(),
    };

    if let Some(scheme) = query.palette.as_deref().and_then(ColorScheme::from_param) {
        state.store.set_color_scheme(scheme);
    }
    let scheme = state.store.color_scheme();
    let view = query
        .view
        .as_deref()
        .and_then(VisualizationView::from_param)
        .unwrap_or_default();

    let content = match view {
        VisualizationView::PieChart | VisualizationView::BarGraph | VisualizationView::ClusterPoints => {
            format!(
                r#"<img src="/visualization/chart.png?view={}" alt="{}" width="{}" height="{}">"#,
                view.as_param(),
                view.label(),
                CHART_WIDTH,
                CHART_HEIGHT
            )
        }
        VisualizationView::TextFormat => text_format_html(&result),
        VisualizationView::ClusterText => cluster_text_html(&result),
    };

    let page = include_str!("./static/visualization.html")
        .replace("<!--SIDEBAR-->", &sidebar_html(view, scheme))
        .replace("<!--PALETTE-->", &palette_html(view, scheme))
        .replace("<!--CONTENT-->", &content);
    Html(page).into_response()
}

/// Serve one chart as PNG. 404 without a stored classification; a render
/// failure is a plain 500 with the message in the body.
pub async fn chart_png(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> Response {
    let result = match state.store.classification() {
        Some(result) => result,
        None => return StatusCode::NOT_FOUND.into_response(),
    };
    let scheme = state.store.color_scheme();
    let view = query
        .view
        .as_deref()
        .and_then(VisualizationView::from_param)
        .unwrap_or_default();

    match render_view_png(&result, view, scheme) {
        Ok(png) => ([(header::CONTENT_TYPE, "image/png")], png).into_response(),
        Err(e) => {
            tracing::error!("chart rendering failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("chart rendering failed: {}", e))
                .into_response()
        }
    }
}

/// Serve the comparison page: both results, all five views side by side.
///
/// The stored pair is consumed by this render; a reload lands on the import
/// page.
pub async fn serve_visualization_compare(State(state): State<Arc<AppState>>) -> Response {
    let (first, second) = match state.store.take_comparison() {
        Some(pair) => pair,
        None => return Redirect::to("/import").into_response(),
    };
    let scheme = state.store.color_scheme();

    let mut sections = String::new();
    for view in VisualizationView::ALL {
        sections.push_str(&format!("<h2>{}</h2>\n<div class=\"compare-row\">\n", view.label()));
        for (heading, result) in [("File 1", &first), ("File 2", &second)] {
            sections.push_str(&format!(
                "<div class=\"compare-cell\"><h3>{}</h3>\n{}\n</div>\n",
                heading,
                compare_cell_html(result, view, scheme)
            ));
        }
        sections.push_str("</div>\n");
    }

    let page = include_str!("./static/visualization_compare.html")
        .replace("<!--SECTIONS-->", &sections);
    Html(page).into_response()
}

fn render_view_png(
    result: &ClassificationResult,
    view: VisualizationView,
    scheme: ColorScheme,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    match view {
        VisualizationView::BarGraph => render_bar_png(
            &chart_slices(&result.sentiment_summary, scheme),
            "Sentiment Counts",
            CHART_WIDTH,
            CHART_HEIGHT,
        ),
        VisualizationView::ClusterPoints => render_scatter_png(
            &scatter_series(&result.cluster_points, scheme),
            "Review Clusters",
            CHART_WIDTH,
            CHART_HEIGHT,
        ),
        // Text views have no image; default to the pie for robustness
        _ => render_pie_png(
            &chart_slices(&result.sentiment_summary, scheme),
            "Sentiment Distribution",
            CHART_WIDTH,
            CHART_HEIGHT,
        ),
    }
}

/// One comparison cell: inline image for the graphic views, HTML for the
/// text views. The pair is already consumed, so images must be self-contained.
fn compare_cell_html(
    result: &ClassificationResult,
    view: VisualizationView,
    scheme: ColorScheme,
) -> String {
    match view {
        VisualizationView::TextFormat => text_format_html(result),
        VisualizationView::ClusterText => cluster_text_html(result),
        _ => match render_view_png(result, view, scheme) {
            Ok(png) => format!(
                r#"<img src="data:image/png;base64,{}" alt="{}" width="{}" height="{}">"#,
                BASE64.encode(png),
                view.label(),
                CHART_WIDTH,
                CHART_HEIGHT
            ),
            Err(e) => {
                tracing::error!("comparison chart rendering failed: {}", e);
                format!(r#"<p class="error">Chart unavailable: {}</p>"#, escape_html(&e.to_string()))
            }
        },
    }
}

fn text_format_html(result: &ClassificationResult) -> String {
    let rows = text_rows(&result.sentiment_summary);
    if rows.is_empty() {
        return "<p>No sentiment data.</p>".to_string();
    }

    let mut html = String::from(
        "<table>\n<tr><th>Sentiment</th><th>Reviews</th><th>Share</th></tr>\n",
    );
    for row in rows {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{:.1}%</td></tr>\n",
            escape_html(&row.label),
            row.count,
            row.percentage
        ));
    }
    html.push_str("</table>");
    html
}

fn cluster_text_html(result: &ClassificationResult) -> String {
    let sections = cluster_sections(&result.cluster_samples);
    if sections.is_empty() {
        return "<p>No cluster samples.</p>".to_string();
    }

    let mut html = String::new();
    for (heading, samples) in sections {
        html.push_str(&format!("<h3>{}</h3>\n<ul>\n", escape_html(&heading)));
        for sample in samples {
            html.push_str(&format!("<li>{}</li>\n", escape_html(&sample)));
        }
        html.push_str("</ul>\n");
    }
    html
}

fn sidebar_html(active: VisualizationView, scheme: ColorScheme) -> String {
    let mut html = String::from("<ul>\n");
    for view in VisualizationView::ALL {
        let class = if view == active { r#" class="active""# } else { "" };
        html.push_str(&format!(
            "<li{}><a href=\"/visualization?view={}&palette={}\">{}</a></li>\n",
            class,
            view.as_param(),
            scheme.as_param(),
            view.label()
        ));
    }
    html.push_str("</ul>");
    html
}

fn palette_html(view: VisualizationView, active: ColorScheme) -> String {
    let mut html = String::from("<ul>\n");
    for scheme in ColorScheme::ALL {
        let class = if scheme == active { r#" class="active""# } else { "" };
        html.push_str(&format!(
            "<li{}><a href=\"/visualization?view={}&palette={}\">{}</a></li>\n",
            class,
            view.as_param(),
            scheme.as_param(),
            scheme.label()
        ));
    }
    html.push_str("</ul>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{SentimentDataset, SentimentSummary};
    use std::collections::BTreeMap;

    fn sample_result() -> ClassificationResult {
        ClassificationResult {
            sentiment_summary: SentimentSummary {
                labels: vec!["Positive".into(), "Neutral".into(), "Negative".into()],
                datasets: vec![SentimentDataset {
                    data: vec![6.0, 3.0, 1.0],
                    percentages: None,
                    background_color: None,
                }],
            },
            review_text: "reviews.csv".into(),
            cluster_samples: BTreeMap::from([(
                "0".to_string(),
                vec!["great <product>".to_string()],
            )]),
            cluster_points: BTreeMap::new(),
        }
    }

    #[test]
    fn view_params_round_trip() {
        for view in VisualizationView::ALL {
            assert_eq!(VisualizationView::from_param(view.as_param()), Some(view));
        }
        assert_eq!(VisualizationView::from_param("hologram"), None);
    }

    #[test]
    fn text_format_lists_every_sentiment() {
        let html = text_format_html(&sample_result());
        assert!(html.contains("Positive"));
        assert!(html.contains("60.0%"));
        assert!(html.contains("10.0%"));
    }

    #[test]
    fn cluster_text_escapes_review_samples() {
        let html = cluster_text_html(&sample_result());
        assert!(html.contains("Cluster 1"));
        assert!(html.contains("great &lt;product&gt;"));
        assert!(!html.contains("<product>"));
    }

    #[test]
    fn sidebar_marks_the_active_view() {
        let html = sidebar_html(VisualizationView::BarGraph, ColorScheme::Classic);
        assert!(html.contains(r#"class="active"><a href="/visualization?view=bar"#));
        assert!(html.contains("view=points"));
    }
}
