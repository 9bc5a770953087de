//! Participant identity cookie
//!
//! Every participant route runs behind `identity_middleware`, which makes
//! sure the request carries a well-formed identity and hands it to the
//! handler as an `Extension<UserId>`.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use songflow_common::db::record_user;
use songflow_common::UserId;
use tracing::debug;

use crate::{ApiResult, AppState};

/// Cookie holding the participant identity
pub const USER_COOKIE: &str = "songflow_user";

/// Resolve or issue the caller's identity
///
/// A missing cookie, or one whose value is not a UUID, is replaced by a
/// fresh identity. The identity is recorded before the handler runs.
pub async fn identity_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> ApiResult<(CookieJar, Response)> {
    let presented = jar
        .get(USER_COOKIE)
        .and_then(|cookie| UserId::parse(cookie.value()));

    let (user, jar) = match presented {
        Some(user) => (user, jar),
        None => {
            let user = UserId::generate();
            debug!("Issued new participant identity {}", user);
            let jar = jar.add(identity_cookie(&user));
            (user, jar)
        }
    };

    record_user(&state.db, &user).await?;

    request.extensions_mut().insert(user);
    Ok((jar, next.run(request).await))
}

fn identity_cookie(user: &UserId) -> Cookie<'static> {
    Cookie::build((USER_COOKIE, user.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .permanent()
        .build()
}
