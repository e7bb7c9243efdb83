//! Application wiring: shared state, router, and the server loop.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{DefaultBodyLimit, State},
    middleware,
    response::Html,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::api::ApiClient;
use crate::auth;
use crate::compare::{self, CompareFlow};
use crate::feedback;
use crate::guard;
use crate::import_flow::{self, ImportFlow};
use crate::report;
use crate::session::{FileStore, SessionStore};
use crate::visualize;

/// Uploads are review datasets, not media; 25 MiB is plenty
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared state behind every handler
pub struct AppState {
    pub api: ApiClient,
    pub store: SessionStore,
    pub import: Mutex<ImportFlow>,
    pub compare: Mutex<CompareFlow>,
}

/// Server configuration, filled in from the command line
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address to listen on
    pub bind: String,
    /// Base URL of the classification backend
    pub api_url: String,
    /// Path of the durable state file; `None` keeps state in memory
    pub state_file: Option<PathBuf>,
}

/// Build the state, bind the listener and serve until shutdown
pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = match &config.state_file {
        Some(path) => SessionStore::new(Arc::new(FileStore::open(path)?)),
        None => SessionStore::in_memory(),
    };

    let state = Arc::new(AppState {
        api: ApiClient::new(config.api_url.clone()),
        store,
        import: Mutex::new(ImportFlow::new()),
        compare: Mutex::new(CompareFlow::new()),
    });

    let app = router(state);

    let listener = TcpListener::bind(&config.bind).await?;
    tracing::info!("listening on http://{}", config.bind);
    tracing::info!("backend at {}", config.api_url);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Assemble the full router: public pages redirect authenticated visitors to
/// the dashboard, private pages require a valid session, logout is reachable
/// either way.
pub fn router(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .route("/", get(serve_landing))
        .route("/login", get(auth::serve_login).post(auth::handle_login))
        .route("/register", get(auth::serve_register).post(auth::handle_register))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            guard::redirect_authenticated,
        ));

    let private = Router::new()
        .route("/dashboard", get(serve_dashboard))
        .route("/import", get(import_flow::serve_import))
        .route("/import/upload", post(import_flow::handle_upload))
        .route("/import/classify", post(import_flow::handle_classify))
        .route("/compare", get(compare::serve_compare).post(compare::handle_compare))
        .route("/visualization", get(visualize::serve_visualization))
        .route("/visualization/chart.png", get(visualize::chart_png))
        .route("/visualization-compare", get(visualize::serve_visualization_compare))
        .route("/feedback", get(feedback::serve_feedback))
        .route("/feedback/interface", post(feedback::handle_interface))
        .route("/feedback/review", post(feedback::handle_review))
        .route("/report", get(report::serve_report))
        .route("/report/generate", post(report::handle_generate))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            guard::require_session,
        ));

    Router::new()
        .merge(public)
        .merge(private)
        .route("/logout", get(auth::handle_logout))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn serve_landing() -> Html<&'static str> {
    Html(include_str!("./static/landing.html"))
}

/// The dashboard greets the logged-in user by first name
async fn serve_dashboard(State(state): State<Arc<AppState>>) -> Html<String> {
    let greeting = match state.store.user() {
        Some(user) if !user.first_name.is_empty() => {
            format!("Welcome, {}", auth::escape_html(&user.first_name))
        }
        _ => "Welcome".to_string(),
    };

    let page = include_str!("./static/dashboard.html").replace("<!--GREETING-->", &greeting);
    Html(page)
}
