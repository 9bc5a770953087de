//! Ballot Engine: one complete 3/2/1 ballot per user per flow
//!
//! A ballot is exactly three entries whose points are {1, 2, 3}, each
//! naming a different song that the voter did not submit. The three rows
//! are written in one transaction; a user never ends up with a partial
//! ballot.

use super::store::require_current_flow;
use super::submissions::owned_submission;
use super::Phase;
use crate::db::begin_write;
use crate::identity::UserId;
use crate::time::unix_now;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

/// Point values of a complete ballot
pub const BALLOT_POINTS: [i64; 3] = [1, 2, 3];

const DUPLICATE_BALLOT: &str = "You have already voted";

/// One point assignment to a song
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotEntry {
    pub song_id: i64,
    pub points: i64,
}

/// Entry count and point-set checks that need no storage
fn validate_points(entries: &[BallotEntry]) -> Result<()> {
    if entries.len() != BALLOT_POINTS.len() {
        return Err(Error::Validation(
            "You must submit exactly 3 votes".to_string(),
        ));
    }

    let mut points: Vec<i64> = entries.iter().map(|e| e.points).collect();
    points.sort_unstable();
    if points != BALLOT_POINTS {
        return Err(Error::Validation(
            "Votes must have 1, 2, and 3 points".to_string(),
        ));
    }

    Ok(())
}

fn validate_distinct_targets(entries: &[BallotEntry]) -> Result<()> {
    let targets: HashSet<i64> = entries.iter().map(|e| e.song_id).collect();
    if targets.len() != entries.len() {
        return Err(Error::Validation(
            "Cannot vote for the same song multiple times".to_string(),
        ));
    }
    Ok(())
}

/// Record `user`'s complete ballot in the current flow
///
/// Checked in this order, first failure wins:
/// 1. `Phase` unless voting is open
/// 2. `Validation` unless exactly three entries
/// 3. `Validation` unless the points are exactly {1, 2, 3}
/// 4. `Duplicate` if the user already has any entry in this flow
/// 5. `SelfVote` if an entry targets the user's own submission
/// 6. `Validation` if two entries target the same song
/// 7. `Validation` if a target is not a song of this flow
pub async fn submit_ballot(
    pool: &SqlitePool,
    user: &UserId,
    entries: &[BallotEntry],
) -> Result<()> {
    let mut tx = begin_write(pool).await?;

    let flow = require_current_flow(&mut *tx).await?;
    if flow.phase != Phase::VotingOpen {
        return Err(Error::Phase("Voting is not open".to_string()));
    }

    validate_points(entries)?;

    let existing: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM ballot_entries WHERE flow_id = ? AND user_id = ?")
            .bind(flow.id.to_string())
            .bind(user.as_str())
            .fetch_one(&mut *tx)
            .await?;
    if existing > 0 {
        return Err(Error::Duplicate(DUPLICATE_BALLOT.to_string()));
    }

    if let Some(own_id) = owned_submission(&mut *tx, &flow.id, user).await? {
        if entries.iter().any(|e| e.song_id == own_id) {
            return Err(Error::SelfVote(
                "You cannot vote for your own song".to_string(),
            ));
        }
    }

    validate_distinct_targets(entries)?;

    let known: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM submissions WHERE flow_id = ? AND id IN (?, ?, ?)",
    )
    .bind(flow.id.to_string())
    .bind(entries[0].song_id)
    .bind(entries[1].song_id)
    .bind(entries[2].song_id)
    .fetch_one(&mut *tx)
    .await?;
    if known != entries.len() as i64 {
        return Err(Error::Validation(
            "Votes must be for songs in the current flow".to_string(),
        ));
    }

    let voted_at = unix_now();
    for entry in entries {
        sqlx::query(
            r#"
            INSERT INTO ballot_entries (flow_id, user_id, song_id, points, voted_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(flow.id.to_string())
        .bind(user.as_str())
        .bind(entry.song_id)
        .bind(entry.points)
        .bind(voted_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::from_insert(e, DUPLICATE_BALLOT))?;
    }

    tx.commit().await?;

    info!("Ballot recorded for flow {} ({} entries)", flow.id, entries.len());

    Ok(())
}

/// Whether `user` has a complete ballot (exactly three entries)
pub async fn has_voted(pool: &SqlitePool, flow_id: &Uuid, user: &UserId) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM ballot_entries WHERE flow_id = ? AND user_id = ?")
            .bind(flow_id.to_string())
            .bind(user.as_str())
            .fetch_one(pool)
            .await?;

    Ok(count == BALLOT_POINTS.len() as i64)
}

/// The user's recorded entries, highest points first
pub async fn my_entries(
    pool: &SqlitePool,
    flow_id: &Uuid,
    user: &UserId,
) -> Result<Vec<BallotEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT song_id, points
        FROM ballot_entries
        WHERE flow_id = ? AND user_id = ?
        ORDER BY points DESC
        "#,
    )
    .bind(flow_id.to_string())
    .bind(user.as_str())
    .fetch_all(pool)
    .await?;

    debug!("Loaded {} ballot entries for user in flow {}", rows.len(), flow_id);

    Ok(rows
        .iter()
        .map(|row| BallotEntry {
            song_id: row.get("song_id"),
            points: row.get("points"),
        })
        .collect())
}

/// Number of distinct users with at least one entry in the flow
pub async fn voter_count(pool: &SqlitePool, flow_id: &Uuid) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(DISTINCT user_id) FROM ballot_entries WHERE flow_id = ?")
        .bind(flow_id.to_string())
        .fetch_one(pool)
        .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_in_memory;
    use crate::flow::{create_flow, set_phase, submit, NewSubmission};

    fn entry(song_id: i64, points: i64) -> BallotEntry {
        BallotEntry { song_id, points }
    }

    fn song(name: &str) -> NewSubmission {
        NewSubmission {
            song_name: name.to_string(),
            song_author: "Artist".to_string(),
            song_link: "https://youtu.be/abc".to_string(),
            submitter_name: name.to_string(),
        }
    }

    /// Flow in voting phase with four songs; returns (flow id, owners, song ids)
    async fn voting_flow(pool: &SqlitePool) -> (Uuid, Vec<UserId>, Vec<i64>) {
        let flow = create_flow(pool, "Road Trip", None).await.unwrap();
        set_phase(pool, 1, None).await.unwrap();

        let mut owners = Vec::new();
        let mut ids = Vec::new();
        for name in ["A", "B", "C", "D"] {
            let owner = UserId::generate();
            ids.push(submit(pool, &owner, &song(name)).await.unwrap());
            owners.push(owner);
        }

        set_phase(pool, 2, None).await.unwrap();
        (flow.id, owners, ids)
    }

    #[test]
    fn test_validate_points_order_independent() {
        assert!(validate_points(&[entry(1, 3), entry(2, 1), entry(3, 2)]).is_ok());
        assert!(validate_points(&[entry(1, 1), entry(2, 2), entry(3, 3)]).is_ok());
    }

    #[test]
    fn test_validate_points_rejects_wrong_sets() {
        for points in [[1, 1, 2], [1, 2, 4], [0, 2, 3], [3, 3, 3], [-1, 2, 3]] {
            let entries: Vec<_> = points
                .iter()
                .enumerate()
                .map(|(i, p)| entry(i as i64 + 1, *p))
                .collect();
            assert!(
                matches!(validate_points(&entries), Err(Error::Validation(_))),
                "{:?} must be rejected",
                points
            );
        }
    }

    #[test]
    fn test_validate_points_rejects_wrong_count() {
        assert!(validate_points(&[]).is_err());
        assert!(validate_points(&[entry(1, 1), entry(2, 2)]).is_err());
        assert!(validate_points(&[entry(1, 1), entry(2, 2), entry(3, 3), entry(4, 1)]).is_err());
    }

    #[tokio::test]
    async fn test_submit_ballot_success() {
        let pool = init_in_memory().await.unwrap();
        let (flow_id, _, ids) = voting_flow(&pool).await;
        let voter = UserId::generate();

        assert!(!has_voted(&pool, &flow_id, &voter).await.unwrap());

        submit_ballot(&pool, &voter, &[entry(ids[0], 1), entry(ids[1], 3), entry(ids[2], 2)])
            .await
            .unwrap();

        assert!(has_voted(&pool, &flow_id, &voter).await.unwrap());
        let mine = my_entries(&pool, &flow_id, &voter).await.unwrap();
        assert_eq!(mine, vec![entry(ids[1], 3), entry(ids[2], 2), entry(ids[0], 1)]);
        assert_eq!(voter_count(&pool, &flow_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_second_ballot_is_duplicate() {
        let pool = init_in_memory().await.unwrap();
        let (flow_id, _, ids) = voting_flow(&pool).await;
        let voter = UserId::generate();

        let ballot = [entry(ids[0], 3), entry(ids[1], 2), entry(ids[2], 1)];
        submit_ballot(&pool, &voter, &ballot).await.unwrap();

        let other = [entry(ids[3], 3), entry(ids[2], 2), entry(ids[1], 1)];
        assert!(matches!(
            submit_ballot(&pool, &voter, &other).await,
            Err(Error::Duplicate(_))
        ));

        // First ballot untouched
        let mine = my_entries(&pool, &flow_id, &voter).await.unwrap();
        assert_eq!(mine, ballot.to_vec());
    }

    #[tokio::test]
    async fn test_self_vote_rejected() {
        let pool = init_in_memory().await.unwrap();
        let (flow_id, owners, ids) = voting_flow(&pool).await;

        let result = submit_ballot(
            &pool,
            &owners[0],
            &[entry(ids[0], 3), entry(ids[1], 2), entry(ids[2], 1)],
        )
        .await;
        assert!(matches!(result, Err(Error::SelfVote(_))));
        assert!(my_entries(&pool, &flow_id, &owners[0]).await.unwrap().is_empty());

        // Owners may vote for everyone else
        submit_ballot(
            &pool,
            &owners[0],
            &[entry(ids[1], 3), entry(ids[2], 2), entry(ids[3], 1)],
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_target_rejected_regardless_of_points() {
        let pool = init_in_memory().await.unwrap();
        let (flow_id, _, ids) = voting_flow(&pool).await;
        let voter = UserId::generate();

        for ballot in [
            [entry(ids[0], 1), entry(ids[0], 2), entry(ids[1], 3)],
            [entry(ids[2], 3), entry(ids[1], 2), entry(ids[2], 1)],
            [entry(ids[3], 1), entry(ids[3], 2), entry(ids[3], 3)],
        ] {
            assert!(matches!(
                submit_ballot(&pool, &voter, &ballot).await,
                Err(Error::Validation(_))
            ));
        }
        assert!(my_entries(&pool, &flow_id, &voter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_song_rejected() {
        let pool = init_in_memory().await.unwrap();
        let (flow_id, _, ids) = voting_flow(&pool).await;
        let voter = UserId::generate();

        let result = submit_ballot(
            &pool,
            &voter,
            &[entry(ids[0], 3), entry(ids[1], 2), entry(9_999, 1)],
        )
        .await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(!has_voted(&pool, &flow_id, &voter).await.unwrap());
    }

    #[tokio::test]
    async fn test_ballot_rejected_outside_voting_phase() {
        let pool = init_in_memory().await.unwrap();
        let (_, _, ids) = voting_flow(&pool).await;
        let voter = UserId::generate();
        let ballot = [entry(ids[0], 3), entry(ids[1], 2), entry(ids[2], 1)];

        for phase in [0, 1, 3] {
            set_phase(&pool, phase, None).await.unwrap();
            assert!(
                matches!(submit_ballot(&pool, &voter, &ballot).await, Err(Error::Phase(_))),
                "phase {} must refuse ballots",
                phase
            );
        }
    }

    #[tokio::test]
    async fn test_validation_order() {
        let pool = init_in_memory().await.unwrap();
        let (_, owners, ids) = voting_flow(&pool).await;

        // Bad point set is reported before self vote
        let result = submit_ballot(
            &pool,
            &owners[0],
            &[entry(ids[0], 1), entry(ids[1], 1), entry(ids[2], 2)],
        )
        .await;
        assert!(matches!(result, Err(Error::Validation(_))));

        // Self vote is reported before duplicate target
        let result = submit_ballot(
            &pool,
            &owners[0],
            &[entry(ids[0], 1), entry(ids[0], 2), entry(ids[1], 3)],
        )
        .await;
        assert!(matches!(result, Err(Error::SelfVote(_))));
    }

    #[tokio::test]
    async fn test_duplicate_reported_before_self_vote() {
        let pool = init_in_memory().await.unwrap();
        let (_, owners, ids) = voting_flow(&pool).await;

        submit_ballot(
            &pool,
            &owners[0],
            &[entry(ids[1], 3), entry(ids[2], 2), entry(ids[3], 1)],
        )
        .await
        .unwrap();

        let result = submit_ballot(
            &pool,
            &owners[0],
            &[entry(ids[0], 3), entry(ids[1], 2), entry(ids[2], 1)],
        )
        .await;
        assert!(matches!(result, Err(Error::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_phase_reported_before_ballot_shape() {
        let pool = init_in_memory().await.unwrap();
        let (_, _, ids) = voting_flow(&pool).await;
        let voter = UserId::generate();

        for phase in [0, 1, 3] {
            set_phase(&pool, phase, None).await.unwrap();

            let short = submit_ballot(&pool, &voter, &[entry(ids[0], 3), entry(ids[1], 2)]).await;
            assert!(matches!(short, Err(Error::Phase(_))), "phase {}", phase);

            let bad_points = submit_ballot(
                &pool,
                &voter,
                &[entry(ids[0], 1), entry(ids[1], 1), entry(ids[2], 2)],
            )
            .await;
            assert!(matches!(bad_points, Err(Error::Phase(_))), "phase {}", phase);
        }
    }

    #[tokio::test]
    async fn test_partial_ballot_is_not_a_vote_but_blocks_resubmission() {
        let pool = init_in_memory().await.unwrap();
        let (flow_id, _, ids) = voting_flow(&pool).await;
        let voter = UserId::generate();

        // Simulate a broken writer that left two entries behind
        for (song_id, points) in [(ids[0], 3), (ids[1], 2)] {
            sqlx::query(
                "INSERT INTO ballot_entries (flow_id, user_id, song_id, points, voted_at)
                 VALUES (?, ?, ?, ?, 0)",
            )
            .bind(flow_id.to_string())
            .bind(voter.as_str())
            .bind(song_id)
            .bind(points)
            .execute(&pool)
            .await
            .unwrap();
        }

        assert!(!has_voted(&pool, &flow_id, &voter).await.unwrap());
        assert_eq!(my_entries(&pool, &flow_id, &voter).await.unwrap().len(), 2);

        let result = submit_ballot(
            &pool,
            &voter,
            &[entry(ids[2], 3), entry(ids[3], 2), entry(ids[0], 1)],
        )
        .await;
        assert!(matches!(result, Err(Error::Duplicate(_))));
    }
}
