//! Song submission and listing

use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};
use serde::Serialize;
use songflow_common::flow::{self, NewSubmission, Phase, Submission};
use songflow_common::UserId;

use crate::{ApiResult, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSongResponse {
    pub success: bool,
    pub song_id: i64,
}

/// GET /api/songs/list response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SongListResponse {
    pub songs: Vec<Submission>,
    pub phase: Phase,
    pub theme: Option<String>,
    pub has_submitted: bool,
    /// Lets the voting page disable the caller's own song
    pub own_song_id: Option<i64>,
}

/// POST /api/songs/submit
pub async fn submit_song(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
    payload: Result<Json<NewSubmission>, JsonRejection>,
) -> ApiResult<Json<SubmitSongResponse>> {
    let Json(song) = payload?;
    let song_id = flow::submit(&state.db, &user, &song).await?;

    Ok(Json(SubmitSongResponse {
        success: true,
        song_id,
    }))
}

/// GET /api/songs/list
///
/// Submitter names are hidden while voting is open.
pub async fn list_songs(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
) -> ApiResult<Json<SongListResponse>> {
    let Some(current) = flow::get_current_flow(&state.db).await? else {
        return Ok(Json(SongListResponse {
            songs: Vec::new(),
            phase: Phase::Idle,
            theme: None,
            has_submitted: false,
            own_song_id: None,
        }));
    };

    let hide_submitters = current.phase == Phase::VotingOpen;
    let songs = flow::list(&state.db, &current.id, hide_submitters).await?;
    let own_song_id = flow::owned_submission(&state.db, &current.id, &user).await?;

    Ok(Json(SongListResponse {
        songs,
        phase: current.phase,
        theme: Some(current.theme),
        has_submitted: own_song_id.is_some(),
        own_song_id,
    }))
}
