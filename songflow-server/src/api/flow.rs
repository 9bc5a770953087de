//! Participant view of the active flow and the timer check

use axum::{extract::State, Extension, Json};
use serde::Serialize;
use songflow_common::flow::{self, Phase, TimerStatus};
use songflow_common::time::unix_now;
use songflow_common::UserId;

use crate::{ApiResult, AppState};

/// GET /api/flow response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowView {
    pub phase: Phase,
    pub theme: Option<String>,
    pub has_submitted: bool,
    pub has_voted: bool,
    /// Seconds left before the timer advances the phase
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_seconds: Option<i64>,
}

/// GET /api/flow
///
/// Phase 0 with no theme when no flow has been created yet.
pub async fn get_flow(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
) -> ApiResult<Json<FlowView>> {
    let Some(current) = flow::get_current_flow(&state.db).await? else {
        return Ok(Json(FlowView {
            phase: Phase::Idle,
            theme: None,
            has_submitted: false,
            has_voted: false,
            timer_seconds: None,
        }));
    };

    Ok(Json(FlowView {
        phase: current.phase,
        has_submitted: flow::has_submitted(&state.db, &current.id, &user).await?,
        has_voted: flow::has_voted(&state.db, &current.id, &user).await?,
        timer_seconds: current.remaining_seconds(unix_now()),
        theme: Some(current.theme),
    }))
}

/// GET /api/timer-check
///
/// Advances the phase when its timer window has elapsed.
pub async fn timer_check(State(state): State<AppState>) -> ApiResult<Json<TimerStatus>> {
    Ok(Json(flow::check_timer(&state.db).await?))
}
