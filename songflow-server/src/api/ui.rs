//! UI serving routes
//!
//! Pages and assets are compiled into the binary.

use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};

const INDEX_HTML: &str = include_str!("../ui/index.html");
const ADMIN_HTML: &str = include_str!("../ui/admin.html");
const PRESENTATION_HTML: &str = include_str!("../ui/presentation.html");
const APP_JS: &str = include_str!("../ui/app.js");
const ADMIN_JS: &str = include_str!("../ui/admin.js");
const PRESENTATION_JS: &str = include_str!("../ui/presentation.js");
const SONGFLOW_CSS: &str = include_str!("../ui/songflow.css");

fn asset(content_type: &'static str, body: &'static str) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response()
}

/// GET /
///
/// Participant page: submit, vote, see results
pub async fn serve_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /admin
pub async fn serve_admin() -> Html<&'static str> {
    Html(ADMIN_HTML)
}

/// GET /presentation
///
/// Big-screen view for the host
pub async fn serve_presentation() -> Html<&'static str> {
    Html(PRESENTATION_HTML)
}

pub async fn serve_app_js() -> Response {
    asset("application/javascript", APP_JS)
}

pub async fn serve_admin_js() -> Response {
    asset("application/javascript", ADMIN_JS)
}

pub async fn serve_presentation_js() -> Response {
    asset("application/javascript", PRESENTATION_JS)
}

pub async fn serve_css() -> Response {
    asset("text/css", SONGFLOW_CSS)
}
