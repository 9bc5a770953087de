//! HTTP API handlers for songflow-server

pub mod admin;
pub mod auth;
pub mod flow;
pub mod health;
pub mod identity;
pub mod rate_limit;
pub mod songs;
pub mod ui;
pub mod votes;

pub use admin::{admin_status, check_admin, create_flow, login, logout, set_phase};
pub use auth::{admin_middleware, ADMIN_COOKIE};
pub use flow::{get_flow, timer_check};
pub use health::health_routes;
pub use identity::{identity_middleware, USER_COOKIE};
pub use rate_limit::{limit_logins, limit_reads, limit_submissions, RateLimiters};
pub use songs::{list_songs, submit_song};
pub use ui::{
    serve_admin, serve_admin_js, serve_app_js, serve_css, serve_index, serve_presentation,
    serve_presentation_js,
};
pub use votes::{get_results, my_votes, submit_votes};
