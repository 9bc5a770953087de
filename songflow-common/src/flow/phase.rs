//! Phase Controller: flow creation, phase changes and the lazy phase timer
//!
//! There is no scheduler. `check_timer` is invoked by polling clients and
//! advances at most one phase per expired window, however many callers race.

use super::store::{get_current_flow, require_current_flow};
use super::{Flow, Phase};
use crate::db::begin_write;
use crate::time::unix_now;
use crate::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

/// Outcome of a timer check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStatus {
    pub advanced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_phase: Option<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<i64>,
}

impl TimerStatus {
    fn idle() -> Self {
        Self {
            advanced: false,
            new_phase: None,
            remaining_seconds: None,
        }
    }

    fn waiting(remaining_seconds: Option<i64>) -> Self {
        Self {
            advanced: false,
            new_phase: None,
            remaining_seconds,
        }
    }

    fn advanced_to(phase: Phase) -> Self {
        Self {
            advanced: true,
            new_phase: Some(phase),
            remaining_seconds: None,
        }
    }
}

fn validate_timer(timer_seconds: Option<i64>) -> Result<()> {
    match timer_seconds {
        Some(seconds) if seconds <= 0 => Err(Error::Validation(format!(
            "Timer must be a positive number of seconds (got {})",
            seconds
        ))),
        _ => Ok(()),
    }
}

/// Replace any existing flow with a new one in phase 0
///
/// All submissions and ballot entries of the previous flow are deleted in
/// the same transaction.
pub async fn create_flow(
    pool: &SqlitePool,
    theme: &str,
    timer_seconds: Option<i64>,
) -> Result<Flow> {
    let theme = theme.trim();
    if theme.is_empty() {
        return Err(Error::Validation("Theme is required".to_string()));
    }
    validate_timer(timer_seconds)?;

    let now = unix_now();
    let flow = Flow {
        id: Uuid::new_v4(),
        theme: theme.to_string(),
        phase: Phase::Idle,
        phase_timer_seconds: timer_seconds,
        phase_started_at: now,
        created_at: now,
    };

    let mut tx = begin_write(pool).await?;

    // Children first: ballot entries reference submissions
    let ballots = sqlx::query("DELETE FROM ballot_entries")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let songs = sqlx::query("DELETE FROM submissions")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    sqlx::query("DELETE FROM current_flow")
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO current_flow (id, flow_id, theme, phase, phase_timer, phase_started_at, created_at)
        VALUES (1, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(flow.id.to_string())
    .bind(&flow.theme)
    .bind(flow.phase.as_i64())
    .bind(flow.phase_timer_seconds)
    .bind(flow.phase_started_at)
    .bind(flow.created_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        "Created flow {} with theme '{}' (discarded {} submissions, {} ballot entries)",
        flow.id, flow.theme, songs, ballots
    );

    Ok(flow)
}

/// Jump to any phase 0-3 and restart the phase window
///
/// The timer is replaced by `timer_seconds` (`None` clears it). Existing
/// submissions and ballots are never touched.
pub async fn set_phase(
    pool: &SqlitePool,
    phase: i64,
    timer_seconds: Option<i64>,
) -> Result<Flow> {
    let phase = Phase::try_from(phase)?;
    validate_timer(timer_seconds)?;

    let mut tx = begin_write(pool).await?;

    let updated = sqlx::query(
        "UPDATE current_flow SET phase = ?, phase_timer = ?, phase_started_at = ? WHERE id = 1",
    )
    .bind(phase.as_i64())
    .bind(timer_seconds)
    .bind(unix_now())
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(Error::Phase("No active flow".to_string()));
    }

    let flow = require_current_flow(&mut *tx).await?;
    tx.commit().await?;

    info!(
        "Flow {} moved to phase {} ({}), timer {:?}",
        flow.id,
        phase.as_i64(),
        phase.label(),
        timer_seconds
    );

    Ok(flow)
}

/// Advance the phase if its timer window has expired
pub async fn check_timer(pool: &SqlitePool) -> Result<TimerStatus> {
    check_timer_at(pool, unix_now()).await
}

/// `check_timer` evaluated at an explicit Unix time
pub async fn check_timer_at(pool: &SqlitePool, now: i64) -> Result<TimerStatus> {
    let Some(flow) = get_current_flow(pool).await? else {
        return Ok(TimerStatus::idle());
    };
    let Some(timer) = flow.phase_timer_seconds else {
        return Ok(TimerStatus::idle());
    };

    let expired = now - flow.phase_started_at >= timer;
    let next = match flow.phase.next() {
        Some(next) if expired => next,
        _ => return Ok(TimerStatus::waiting(flow.remaining_seconds(now))),
    };

    // Conditional on what was read: a concurrent checker or an admin
    // change makes this a no-op instead of a second advance.
    let advanced = sqlx::query(
        r#"
        UPDATE current_flow
        SET phase = ?, phase_started_at = ?
        WHERE id = 1 AND flow_id = ? AND phase = ? AND phase_started_at = ?
        "#,
    )
    .bind(next.as_i64())
    .bind(now)
    .bind(flow.id.to_string())
    .bind(flow.phase.as_i64())
    .bind(flow.phase_started_at)
    .execute(pool)
    .await?
    .rows_affected()
        == 1;

    if advanced {
        info!(
            "Phase timer expired for flow {}: advanced {} -> {}",
            flow.id,
            flow.phase.as_i64(),
            next.as_i64()
        );
        return Ok(TimerStatus::advanced_to(next));
    }

    debug!("Timer advance for flow {} already applied elsewhere", flow.id);
    let current = get_current_flow(pool).await?;
    Ok(TimerStatus::waiting(
        current.and_then(|f| f.remaining_seconds(now)),
    ))
}
