//! Ballot submission, own-ballot lookup and results

use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use songflow_common::flow::{self, BallotEntry, Phase, RankedSubmission};
use songflow_common::{Error, UserId};

use crate::{ApiResult, AppState};

/// POST /api/votes/submit body
#[derive(Debug, Deserialize)]
pub struct BallotRequest {
    #[serde(default)]
    pub votes: Vec<BallotEntry>,
}

#[derive(Debug, Serialize)]
pub struct BallotResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyVotesResponse {
    pub votes: Vec<BallotEntry>,
    pub has_voted: bool,
}

/// GET /api/votes/results response
#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub phase: Phase,
    pub theme: Option<String>,
    pub results: Vec<RankedSubmission>,
}

/// POST /api/votes/submit
pub async fn submit_votes(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
    payload: Result<Json<BallotRequest>, JsonRejection>,
) -> ApiResult<Json<BallotResponse>> {
    let Json(ballot) = payload?;
    flow::submit_ballot(&state.db, &user, &ballot.votes).await?;
    Ok(Json(BallotResponse { success: true }))
}

/// GET /api/votes/my-votes
pub async fn my_votes(
    State(state): State<AppState>,
    Extension(user): Extension<UserId>,
) -> ApiResult<Json<MyVotesResponse>> {
    let Some(current) = flow::get_current_flow(&state.db).await? else {
        return Ok(Json(MyVotesResponse {
            votes: Vec::new(),
            has_voted: false,
        }));
    };

    Ok(Json(MyVotesResponse {
        votes: flow::my_entries(&state.db, &current.id, &user).await?,
        has_voted: flow::has_voted(&state.db, &current.id, &user).await?,
    }))
}

/// GET /api/votes/results
///
/// Only once the flow has reached `ResultsVisible`. Without a flow the
/// ranking is empty.
pub async fn get_results(State(state): State<AppState>) -> ApiResult<Json<ResultsResponse>> {
    let Some(current) = flow::get_current_flow(&state.db).await? else {
        return Ok(Json(ResultsResponse {
            phase: Phase::Idle,
            theme: None,
            results: Vec::new(),
        }));
    };

    if current.phase != Phase::ResultsVisible {
        return Err(Error::Phase("Results are not available yet".to_string()).into());
    }

    Ok(Json(ResultsResponse {
        phase: current.phase,
        results: flow::results(&state.db, &current.id).await?,
        theme: Some(current.theme),
    }))
}
