//! Phase state machine and voting-integrity engine
//!
//! Exactly one flow exists at a time. The phase gates what participants may
//! do:
//!
//! | Phase | Name             | Legal participant action |
//! |-------|------------------|--------------------------|
//! | 0     | Idle             | none                     |
//! | 1     | SubmissionOpen   | submit one song          |
//! | 2     | VotingOpen       | cast one 3/2/1 ballot    |
//! | 3     | ResultsVisible   | read the ranking         |
//!
//! Every multi-row write runs in a single transaction; uniqueness is also
//! enforced by the schema, so a lost race surfaces as `Error::Duplicate`.

pub mod ballots;
pub mod phase;
pub mod scoring;
pub mod store;
pub mod submissions;

pub use ballots::{has_voted, my_entries, submit_ballot, voter_count, BallotEntry};
pub use phase::{check_timer, check_timer_at, create_flow, set_phase, TimerStatus};
pub use scoring::{rank, results, RankedSubmission};
pub use store::get_current_flow;
pub use submissions::{
    has_submitted, list, owned_submission, submit, NewSubmission, Submission,
};

use crate::Error;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Flow lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum Phase {
    Idle = 0,
    SubmissionOpen = 1,
    VotingOpen = 2,
    ResultsVisible = 3,
}

impl Phase {
    /// Following phase, or `None` from `ResultsVisible`
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Idle => Some(Phase::SubmissionOpen),
            Phase::SubmissionOpen => Some(Phase::VotingOpen),
            Phase::VotingOpen => Some(Phase::ResultsVisible),
            Phase::ResultsVisible => None,
        }
    }

    pub fn as_i64(self) -> i64 {
        self as i64
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Idle => "Waiting",
            Phase::SubmissionOpen => "Submissions Open",
            Phase::VotingOpen => "Voting Open",
            Phase::ResultsVisible => "Results",
        }
    }
}

impl From<Phase> for i64 {
    fn from(phase: Phase) -> i64 {
        phase.as_i64()
    }
}

impl TryFrom<i64> for Phase {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Phase::Idle),
            1 => Ok(Phase::SubmissionOpen),
            2 => Ok(Phase::VotingOpen),
            3 => Ok(Phase::ResultsVisible),
            other => Err(Error::Validation(format!(
                "Invalid phase {} (expected 0-3)",
                other
            ))),
        }
    }
}

/// The single active flow
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    /// Fresh for every `create_flow`; child rows are keyed by it
    pub id: Uuid,
    pub theme: String,
    pub phase: Phase,
    /// Auto-advance window in seconds, if any
    pub phase_timer_seconds: Option<i64>,
    /// Unix seconds when the current phase window started
    pub phase_started_at: i64,
    pub created_at: i64,
}

impl Flow {
    /// Seconds left in the current timer window (never negative)
    pub fn remaining_seconds(&self, now: i64) -> Option<i64> {
        self.phase_timer_seconds
            .map(|timer| (timer - (now - self.phase_started_at)).max(0))
    }
}
