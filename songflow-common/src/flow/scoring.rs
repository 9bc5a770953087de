//! Scoring Engine: summed points per song and the final ranking

use crate::Result;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::cmp::Ordering;
use uuid::Uuid;

/// One row of the ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedSubmission {
    /// 1-based place in the ranking
    pub position: usize,
    pub id: i64,
    pub song_name: String,
    pub song_author: String,
    pub song_link: String,
    pub submitter_name: String,
    pub total_points: i64,
    /// Ballot entries that named this song
    pub vote_count: i64,
}

/// Ranking of every submission in the flow
///
/// Songs without votes are included with zero points. Visibility is up to
/// the caller; this never checks the phase.
pub async fn results(pool: &SqlitePool, flow_id: &Uuid) -> Result<Vec<RankedSubmission>> {
    let rows = sqlx::query(
        r#"
        SELECT
            s.id,
            s.song_name,
            s.song_author,
            s.song_link,
            s.submitter_name,
            COALESCE(SUM(b.points), 0) AS total_points,
            COUNT(b.id) AS vote_count
        FROM submissions s
        LEFT JOIN ballot_entries b ON b.song_id = s.id AND b.flow_id = s.flow_id
        WHERE s.flow_id = ?
        GROUP BY s.id
        "#,
    )
    .bind(flow_id.to_string())
    .fetch_all(pool)
    .await?;

    let scored = rows
        .iter()
        .map(|row| RankedSubmission {
            position: 0,
            id: row.get("id"),
            song_name: row.get("song_name"),
            song_author: row.get("song_author"),
            song_link: row.get("song_link"),
            submitter_name: row.get("submitter_name"),
            total_points: row.get("total_points"),
            vote_count: row.get("vote_count"),
        })
        .collect();

    Ok(rank(scored))
}

/// Order by total points descending, earlier submission first on ties,
/// then number the positions
pub fn rank(mut scored: Vec<RankedSubmission>) -> Vec<RankedSubmission> {
    scored.sort_by(compare);
    for (index, row) in scored.iter_mut().enumerate() {
        row.position = index + 1;
    }
    scored
}

fn compare(a: &RankedSubmission, b: &RankedSubmission) -> Ordering {
    b.total_points
        .cmp(&a.total_points)
        .then_with(|| a.id.cmp(&b.id))
}
