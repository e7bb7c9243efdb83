/*!
# ReviewLens

A browser frontend for a review sentiment analysis service, built in Rust.

## Overview

ReviewLens lets a user upload a dataset of product reviews, have it
classified by a remote sentiment analysis backend, and explore the result
through interchangeable visualizations. Two datasets can be uploaded together
and compared side by side. Reports (PDF and DOCX) are generated server-side
and offered as downloads, and feedback about the interface, a review file, or
the system itself can be submitted from within the app.

## Architecture

The application is a server-rendered web frontend:

### Page Layer
- **Technologies**: axum, HTML page shells with injected fragments
- **Pages**: landing, login, register, dashboard, import, compare,
  visualization, comparison visualization, feedback, report

### Workflow Layer
- Import and comparison state machines gating upload and classification
- Route guard redirecting by session state (public vs private pages)
- Chart transforms and PNG rendering with plotters

### Persistence Layer
- String-keyed session store with a gzip-compressed JSON file backend
- Stores the session, the uploaded file handle, the classification result,
  the transient comparison pair, and the chosen color palette

## Modules

- **api**: HTTP client for the classification backend
- **app**: Shared state, routing and the server loop
- **auth**: Login, registration and logout
- **charts**: Chart transforms and PNG renderers
- **compare**: Two-file comparison workflow
- **feedback**: Feedback submission and the system feedback view
- **guard**: Session-based route guard middleware
- **import_flow**: Upload-and-classify workflow state machine
- **report**: Report generation and download links
- **session**: Durable key-value session store
- **visualize**: Visualization pages and the chart endpoint
*/

pub mod api;
pub mod app;
pub mod auth;
pub mod charts;
pub mod compare;
pub mod feedback;
pub mod guard;
pub mod import_flow;
pub mod report;
pub mod session;
pub mod visualize;

pub use api::{ApiClient, ApiError, ClassificationResult, SentimentSummary, UploadedFile, UserRecord};
pub use charts::ColorScheme;
pub use compare::CompareFlow;
pub use import_flow::{ImportFlow, ImportState};
pub use session::{FileStore, KeyValueStore, MemoryStore, SessionStore};
pub use visualize::VisualizationView;
