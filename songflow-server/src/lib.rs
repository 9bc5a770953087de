//! songflow-server library - HTTP surface for the SongFlow engine
//!
//! Participants are identified by an opaque cookie; the admin by a cookie
//! carrying the password digest. All flow rules live in `songflow_common`.

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use songflow_common::config::RateLimitConfig;
use songflow_common::identity::password_digest;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;

pub use error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Digest of the configured admin password
    pub admin_digest: Arc<str>,
    /// Per-client limiters; `None` when rate limiting is disabled
    pub rate_limits: Option<Arc<api::RateLimiters>>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, admin_password: &str, limits: &RateLimitConfig) -> Self {
        let rate_limits = limits
            .enabled
            .then(|| Arc::new(api::RateLimiters::new(limits)));

        Self {
            db,
            admin_digest: password_digest(admin_password).into(),
            rate_limits,
        }
    }
}

/// Build application router
///
/// Participant routes carry an identity cookie, admin routes require the
/// admin cookie, everything else is public.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware::from_fn_with_state;
    use axum::routing::{get, post};

    let participant = Router::new()
        .route("/api/flow", get(api::get_flow))
        .route(
            "/api/songs/submit",
            post(api::submit_song)
                .layer(from_fn_with_state(state.clone(), api::limit_submissions)),
        )
        .route(
            "/api/songs/list",
            get(api::list_songs).layer(from_fn_with_state(state.clone(), api::limit_reads)),
        )
        .route(
            "/api/votes/submit",
            post(api::submit_votes)
                .layer(from_fn_with_state(state.clone(), api::limit_submissions)),
        )
        .route(
            "/api/votes/my-votes",
            get(api::my_votes).layer(from_fn_with_state(state.clone(), api::limit_reads)),
        )
        .route(
            "/api/votes/results",
            get(api::get_results).layer(from_fn_with_state(state.clone(), api::limit_reads)),
        )
        .layer(from_fn_with_state(state.clone(), api::identity_middleware));

    let admin = Router::new()
        .route("/api/admin/flow", post(api::create_flow))
        .route("/api/admin/phase", post(api::set_phase))
        .route("/api/admin/status", get(api::admin_status))
        .layer(from_fn_with_state(state.clone(), api::admin_middleware));

    let public = Router::new()
        .route("/", get(api::serve_index))
        .route("/admin", get(api::serve_admin))
        .route("/presentation", get(api::serve_presentation))
        .route("/static/app.js", get(api::serve_app_js))
        .route("/static/admin.js", get(api::serve_admin_js))
        .route("/static/presentation.js", get(api::serve_presentation_js))
        .route("/static/songflow.css", get(api::serve_css))
        .route("/api/timer-check", get(api::timer_check))
        .route(
            "/api/admin/login",
            post(api::login).layer(from_fn_with_state(state.clone(), api::limit_logins)),
        )
        .route("/api/admin/check", get(api::check_admin))
        .route("/api/admin/logout", post(api::logout))
        .merge(api::health_routes());

    let mut router = Router::new().merge(participant).merge(admin).merge(public);
    for (name, value) in SECURITY_HEADERS {
        router = router.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Hardening headers added to every response unless a handler set them
const SECURITY_HEADERS: [(&str, &str); 9] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "SAMEORIGIN"),
    ("referrer-policy", "no-referrer"),
    ("x-dns-prefetch-control", "off"),
    ("x-xss-protection", "0"),
    ("x-permitted-cross-domain-policies", "none"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("origin-agent-cluster", "?1"),
];
