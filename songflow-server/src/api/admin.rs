//! Admin session and flow control

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use songflow_common::flow::{self, Flow, Phase, RankedSubmission, Submission};
use songflow_common::identity::{digest_matches, password_digest};
use songflow_common::Error;
use tracing::{info, warn};

use super::auth::{admin_cookie, expired_admin_cookie, is_admin};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCheckResponse {
    pub is_admin: bool,
}

/// POST /api/admin/flow body
#[derive(Debug, Deserialize)]
pub struct CreateFlowRequest {
    #[serde(default)]
    pub theme: String,
    pub timer: Option<i64>,
}

/// POST /api/admin/phase body
#[derive(Debug, Deserialize)]
pub struct SetPhaseRequest {
    pub phase: Option<i64>,
    pub timer: Option<i64>,
}

/// GET /api/admin/status response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatusResponse {
    pub flow: Option<Flow>,
    pub songs: Vec<Submission>,
    /// Present once results are visible
    pub results: Option<Vec<RankedSubmission>>,
    pub song_count: usize,
    pub voter_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_seconds: Option<i64>,
}

// A timer of 0 means "no timer"
fn timer_from_request(timer: Option<i64>) -> Option<i64> {
    timer.filter(|seconds| *seconds != 0)
}

/// POST /api/admin/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<(CookieJar, Json<SuccessResponse>)> {
    let Json(request) = payload?;
    let digest = password_digest(&request.password);

    if !digest_matches(&digest, &state.admin_digest) {
        warn!("Failed admin login attempt");
        return Err(ApiError::Unauthorized("Invalid password".to_string()));
    }

    info!("Admin logged in");
    Ok((jar.add(admin_cookie(&digest)), Json(SuccessResponse { success: true })))
}

/// GET /api/admin/check
pub async fn check_admin(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Json<AdminCheckResponse> {
    Json(AdminCheckResponse {
        is_admin: is_admin(&state, &jar),
    })
}

/// POST /api/admin/logout
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<SuccessResponse>) {
    (
        jar.remove(expired_admin_cookie()),
        Json(SuccessResponse { success: true }),
    )
}

/// POST /api/admin/flow
///
/// Replaces the active flow; all prior submissions and ballots are dropped.
pub async fn create_flow(
    State(state): State<AppState>,
    payload: Result<Json<CreateFlowRequest>, JsonRejection>,
) -> ApiResult<Json<Flow>> {
    let Json(request) = payload?;
    let created = flow::create_flow(
        &state.db,
        &request.theme,
        timer_from_request(request.timer),
    )
    .await?;
    Ok(Json(created))
}

/// POST /api/admin/phase
pub async fn set_phase(
    State(state): State<AppState>,
    payload: Result<Json<SetPhaseRequest>, JsonRejection>,
) -> ApiResult<Json<Flow>> {
    let Json(request) = payload?;
    let phase = request
        .phase
        .ok_or_else(|| Error::Validation("Invalid phase".to_string()))?;

    let updated = flow::set_phase(&state.db, phase, timer_from_request(request.timer)).await?;
    Ok(Json(updated))
}

/// GET /api/admin/status
pub async fn admin_status(State(state): State<AppState>) -> ApiResult<Json<AdminStatusResponse>> {
    let Some(current) = flow::get_current_flow(&state.db).await? else {
        return Ok(Json(AdminStatusResponse {
            flow: None,
            songs: Vec::new(),
            results: None,
            song_count: 0,
            voter_count: 0,
            timer_seconds: None,
        }));
    };

    let songs = flow::list(&state.db, &current.id, false).await?;
    let results = if current.phase >= Phase::ResultsVisible {
        Some(flow::results(&state.db, &current.id).await?)
    } else {
        None
    };
    let voter_count = flow::voter_count(&state.db, &current.id).await?;

    Ok(Json(AdminStatusResponse {
        song_count: songs.len(),
        songs,
        results,
        voter_count,
        timer_seconds: current.remaining_seconds(songflow_common::time::unix_now()),
        flow: Some(current),
    }))
}
