//! Flow Store: reads of the singleton `current_flow` row

use super::{Flow, Phase};
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};
use uuid::Uuid;

const SELECT_FLOW: &str = r#"
    SELECT flow_id, theme, phase, phase_timer, phase_started_at, created_at
    FROM current_flow
    WHERE id = 1
"#;

/// Get the active flow, if one has been created
///
/// Accepts a pool or an open transaction (`&mut *tx`).
pub async fn get_current_flow<'e, E>(executor: E) -> Result<Option<Flow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(SELECT_FLOW).fetch_optional(executor).await?;
    row.as_ref().map(flow_from_row).transpose()
}

/// Get the active flow or fail with `Error::Phase`
pub async fn require_current_flow<'e, E>(executor: E) -> Result<Flow>
where
    E: Executor<'e, Database = Sqlite>,
{
    get_current_flow(executor)
        .await?
        .ok_or_else(|| Error::Phase("No active flow".to_string()))
}

fn flow_from_row(row: &SqliteRow) -> Result<Flow> {
    let flow_id: String = row.get("flow_id");
    let id = Uuid::parse_str(&flow_id)
        .map_err(|e| Error::Internal(format!("Corrupt flow id '{}': {}", flow_id, e)))?;

    let phase = Phase::try_from(row.get::<i64, _>("phase"))
        .map_err(|e| Error::Internal(format!("Corrupt flow row: {}", e)))?;

    Ok(Flow {
        id,
        theme: row.get("theme"),
        phase,
        phase_timer_seconds: row.get("phase_timer"),
        phase_started_at: row.get("phase_started_at"),
        created_at: row.get("created_at"),
    })
}
