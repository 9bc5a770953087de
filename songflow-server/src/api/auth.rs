//! Admin gate
//!
//! Login stores the digest of the admin password in a cookie; protected
//! routes compare that cookie with the digest of the configured password.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use songflow_common::identity::digest_matches;
use tracing::warn;

use crate::{ApiError, ApiResult, AppState};

/// Cookie holding the admin password digest
pub const ADMIN_COOKIE: &str = "songflow_admin";

/// True when the request carries a valid admin cookie
pub fn is_admin(state: &AppState, jar: &CookieJar) -> bool {
    jar.get(ADMIN_COOKIE)
        .map(|cookie| digest_matches(cookie.value(), &state.admin_digest))
        .unwrap_or(false)
}

/// Reject requests without a valid admin cookie
pub async fn admin_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    if !is_admin(&state, &jar) {
        warn!("Rejected admin request to {}", request.uri().path());
        return Err(ApiError::Unauthorized("Admin access required".to_string()));
    }

    Ok(next.run(request).await)
}

pub(crate) fn admin_cookie(digest: &str) -> Cookie<'static> {
    Cookie::build((ADMIN_COOKIE, digest.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build()
}

pub(crate) fn expired_admin_cookie() -> Cookie<'static> {
    Cookie::build((ADMIN_COOKIE, "")).path("/").build()
}
